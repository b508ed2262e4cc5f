//! Pure naming rules shared by the per-pipeline standardizers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Brain hemisphere of an ROI column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    Left,
    Right,
}

impl Hemisphere {
    /// Canonical column prefix (`L` / `R`).
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Right => "R",
        }
    }

    /// Parse a canonical token (`L`, `R`), as used by CIVET and FreeSurfer 5.x.
    pub fn from_canonical(token: &str) -> Option<Self> {
        match token {
            "L" => Some(Self::Left),
            "R" => Some(Self::Right),
            _ => None,
        }
    }

    /// Parse an ANTs token (`left`, `right`).
    pub fn from_ants(token: &str) -> Option<Self> {
        match token {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Parse a FreeSurfer hemisphere token (`lh`, `rh`).
    pub fn from_freesurfer(token: &str) -> Option<Self> {
        match token {
            "lh" => Some(Self::Left),
            "rh" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Which side of the separator holds the site label in a raw subject ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteLabel {
    /// `SUB01_SITE1`: keep the part before the separator.
    #[default]
    Suffix,
    /// `SITE1_SUB01`: keep the part after the separator.
    Prefix,
}

/// Direction in which a raw subject ID is split once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitFrom {
    /// Split at the first separator.
    Left,
    /// Split at the last separator.
    Right,
}

/// Build a canonical ROI column name.
pub fn roi_column(hemisphere: Hemisphere, region: &str) -> String {
    format!("{}_{}", hemisphere.prefix(), region)
}

/// Replace characters that break formula parsing downstream.
///
/// `&` becomes `_and_`, `-` becomes `_`.
pub fn sanitize_region(name: &str) -> String {
    name.replace('&', "_and_").replace('-', "_")
}

/// Strip the site label from a raw subject ID.
///
/// The ID is split once at the first or last `separator`; IDs without the
/// separator are returned unchanged.
pub fn strip_site_label(raw: &str, separator: char, split: SplitFrom, site: SiteLabel) -> &str {
    let parts = match split {
        SplitFrom::Left => raw.split_once(separator),
        SplitFrom::Right => raw.rsplit_once(separator),
    };
    match (parts, site) {
        (Some((head, _)), SiteLabel::Suffix) => head,
        (Some((_, tail)), SiteLabel::Prefix) => tail,
        (None, _) => raw,
    }
}

/// Check a column name against the canonical `{L|R}_{region}` form.
pub fn is_canonical_roi_column(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[LR]_[A-Za-z0-9_]+$").expect("valid ROI column pattern"))
        .is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hemisphere_tokens() {
        assert_eq!(Hemisphere::from_ants("left"), Some(Hemisphere::Left));
        assert_eq!(Hemisphere::from_ants("Left"), None);
        assert_eq!(Hemisphere::from_freesurfer("rh"), Some(Hemisphere::Right));
        assert_eq!(Hemisphere::from_canonical("L"), Some(Hemisphere::Left));
        assert_eq!(Hemisphere::from_canonical("lh"), None);
    }

    #[test]
    fn test_sanitize_region() {
        assert_eq!(sanitize_region("G&S_frontomargin"), "G_and_S_frontomargin");
        assert_eq!(sanitize_region("G_cingul-Post-dorsal"), "G_cingul_Post_dorsal");
        assert_eq!(sanitize_region("bankssts"), "bankssts");
    }

    #[test]
    fn test_strip_site_label_right_split() {
        assert_eq!(
            strip_site_label("SUB01_SITE1", '_', SplitFrom::Right, SiteLabel::Suffix),
            "SUB01"
        );
        assert_eq!(
            strip_site_label("SUB_01_SITE1", '_', SplitFrom::Right, SiteLabel::Suffix),
            "SUB_01"
        );
        assert_eq!(
            strip_site_label("Caltech_0051456", '_', SplitFrom::Right, SiteLabel::Prefix),
            "0051456"
        );
        assert_eq!(
            strip_site_label("SUB01", '_', SplitFrom::Right, SiteLabel::Suffix),
            "SUB01"
        );
    }

    #[test]
    fn test_strip_site_label_left_split() {
        assert_eq!(
            strip_site_label("SUB01-SITE1-run2", '-', SplitFrom::Left, SiteLabel::Suffix),
            "SUB01"
        );
        assert_eq!(
            strip_site_label("NYU-0051456", '-', SplitFrom::Left, SiteLabel::Prefix),
            "0051456"
        );
    }

    #[test]
    fn test_canonical_roi_column() {
        assert!(is_canonical_roi_column("L_bankssts"));
        assert!(is_canonical_roi_column("R_G_and_S_frontomargin"));
        assert!(!is_canonical_roi_column("lh_bankssts"));
        assert!(!is_canonical_roi_column("L_"));
        assert!(!is_canonical_roi_column("L_G&S"));
        assert!(!is_canonical_roi_column("SubjID"));
    }
}
