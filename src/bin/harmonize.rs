//! harmonize - Multi-pipeline ROI harmonization CLI
//!
//! Standardizes pipeline outputs, merges them into one master table and
//! filters the cohort.

use clap::{Parser, Subcommand, ValueEnum};
use roi_harmonize::data::{CsvOptions, Table};
use roi_harmonize::error::{HarmonizeError, Result};
use roi_harmonize::pipeline::{HarmonizeConfig, Harmonizer};
use roi_harmonize::standardize::{
    Fs60Atlas, Hemisphere, RawInput, RoiLookup, SiteLabel, Standardizer, STRUCTURE_NAME_COLUMN,
};
use std::path::{Path, PathBuf};

/// CLI-friendly pipeline format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFormat {
    /// CIVET `<code>.<L|R>` columns (needs --lookup)
    Civet,
    /// ANTs `left <name>` / `right <name>` columns
    Ants,
    /// FreeSurfer 5.x `<L|R>_<region>_<measure>` columns
    Freesurfer5,
    /// FreeSurfer 6.0 per-hemisphere tables (needs --right)
    Freesurfer6,
}

/// CLI-friendly site label position
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSiteLabel {
    /// `SUB01_SITE1`
    Suffix,
    /// `SITE1_SUB01`
    Prefix,
}

impl From<CliSiteLabel> for SiteLabel {
    fn from(site: CliSiteLabel) -> Self {
        match site {
            CliSiteLabel::Suffix => SiteLabel::Suffix,
            CliSiteLabel::Prefix => SiteLabel::Prefix,
        }
    }
}

/// Multi-pipeline ROI harmonization
#[derive(Parser)]
#[command(name = "harmonize")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full harmonization from a YAML configuration file
    Run {
        /// Path to run configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Output path for the master CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for the filtered cohort CSV
        #[arg(short, long)]
        filtered: Option<PathBuf>,

        /// Output path for the JSON run report
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Standardize a single pipeline output to the canonical schema
    Standardize {
        /// Pipeline format
        #[arg(short, long, value_enum)]
        format: CliFormat,

        /// Raw pipeline CSV (left hemisphere for freesurfer6)
        #[arg(short, long)]
        input: PathBuf,

        /// Right-hemisphere CSV (freesurfer6)
        #[arg(long)]
        right: Option<PathBuf>,

        /// CIVET-to-FreeSurfer lookup CSV (civet)
        #[arg(long)]
        lookup: Option<PathBuf>,

        /// FreeSurfer 6.0 parcellation (aparc, glasser, ...)
        #[arg(long, default_value = "aparc")]
        atlas: String,

        /// Site label position in subject IDs
        #[arg(long, value_enum, default_value = "suffix")]
        site_label: CliSiteLabel,

        /// Canonical subject-ID column
        #[arg(long, default_value = "SubjID")]
        subject_id_column: String,

        /// Output path for the canonical CSV
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Run {
            config,
            output,
            filtered,
            report,
        } => cmd_run(&config, &output, filtered.as_deref(), report.as_deref()),

        Commands::Standardize {
            format,
            input,
            right,
            lookup,
            atlas,
            site_label,
            subject_id_column,
            output,
        } => cmd_standardize(
            format,
            &input,
            right.as_deref(),
            lookup.as_deref(),
            &atlas,
            site_label.into(),
            &subject_id_column,
            &output,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run a harmonization from configuration
fn cmd_run(
    config_path: &Path,
    output_path: &Path,
    filtered_path: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    eprintln!("Loading run configuration from {:?}...", config_path);
    let config = HarmonizeConfig::from_file(config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    eprintln!("Loading {} sources...", config.sources.len());
    let sources = config.load_sources(base_dir)?;
    let qc_table = config.load_qc_table(base_dir)?;

    eprintln!("Running harmonization '{}'...", config.name);
    let output = Harmonizer::from_config(&config).run(&sources, qc_table.as_ref())?;

    eprint!("{}", output.merge);
    eprintln!("Writing master table to {:?}...", output_path);
    output.merge.master.to_csv(output_path)?;

    if let Some(cohort) = &output.cohort {
        eprint!("{}", cohort);
        if let Some(path) = filtered_path {
            eprintln!("Writing filtered cohort to {:?}...", path);
            cohort.table.to_csv(path)?;
        }
    } else if filtered_path.is_some() {
        eprintln!("No QC configured; skipping filtered output");
    }

    if let Some(path) = report_path {
        eprintln!("Writing report to {:?}...", path);
        std::fs::write(path, output.summary().to_json()?)?;
    }

    eprintln!(
        "Done! {} rows in master table, {} in final table",
        output.merge.master.n_rows(),
        output.final_table().n_rows()
    );
    Ok(())
}

/// Standardize one pipeline output
#[allow(clippy::too_many_arguments)]
fn cmd_standardize(
    format: CliFormat,
    input_path: &Path,
    right_path: Option<&Path>,
    lookup_path: Option<&Path>,
    atlas: &str,
    site: SiteLabel,
    subject_id_column: &str,
    output_path: &Path,
) -> Result<()> {
    let read = |path: &Path, id_column: &str| {
        Table::from_csv(path, &CsvOptions::default().text_column(id_column))
    };

    let (standardizer, input) = match format {
        CliFormat::Civet => {
            let lookup_path = lookup_path.ok_or_else(|| {
                HarmonizeError::InvalidParameter("civet needs --lookup".to_string())
            })?;
            let lookup_table = Table::from_csv(
                lookup_path,
                &CsvOptions::default().text_column(RoiLookup::DEFAULT_CODE_COLUMN),
            )?;
            let lookup = RoiLookup::from_table(
                &lookup_table,
                RoiLookup::DEFAULT_CODE_COLUMN,
                RoiLookup::DEFAULT_NAME_COLUMN,
            )?;
            (
                Standardizer::Civet(lookup),
                RawInput::Single(read(input_path, subject_id_column)?),
            )
        }
        CliFormat::Ants => (
            Standardizer::Ants,
            RawInput::Single(read(input_path, STRUCTURE_NAME_COLUMN)?),
        ),
        CliFormat::Freesurfer5 => (
            Standardizer::FreeSurfer5,
            RawInput::Single(read(input_path, subject_id_column)?),
        ),
        CliFormat::Freesurfer6 => {
            let right_path = right_path.ok_or_else(|| {
                HarmonizeError::InvalidParameter("freesurfer6 needs --right".to_string())
            })?;
            let atlas = match atlas {
                "aparc" => Fs60Atlas::Aparc,
                "glasser" => Fs60Atlas::Glasser,
                other => Fs60Atlas::Other(other.to_string()),
            };
            let left = read(input_path, &atlas.subject_column(Hemisphere::Left))?;
            let right = read(right_path, &atlas.subject_column(Hemisphere::Right))?;
            (
                Standardizer::FreeSurfer6 { atlas },
                RawInput::Hemispheres { left, right },
            )
        }
    };

    eprintln!("Standardizing {:?} as {}...", input_path, standardizer.format_name());
    let standardized = standardizer.standardize(&input, subject_id_column, site)?;
    eprint!("{}", standardized.report);

    eprintln!("Writing canonical table to {:?}...", output_path);
    standardized.table.to_csv(output_path)?;
    Ok(())
}
