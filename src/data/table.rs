//! Column-named tables holding one row per subject (or per subject and source).

use crate::data::Value;
use crate::error::{HarmonizeError, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Options for reading delimited text into a [`Table`].
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter.
    pub delimiter: u8,
    /// Columns read verbatim as text (no numeric inference).
    pub text_columns: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            text_columns: Vec::new(),
        }
    }
}

impl CsvOptions {
    /// Tab-separated input.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    /// Read the given column as text.
    pub fn text_column(mut self, column: &str) -> Self {
        self.text_columns.push(column.to_string());
        self
    }
}

/// An in-memory table with uniquely named, ordered columns.
///
/// Every transformation returns a new table; the receiver is never modified
/// except by [`Table::append`].
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table, checking column uniqueness and row widths.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let index = build_index(&columns)?;
        for row in &rows {
            if row.len() != columns.len() {
                return Err(HarmonizeError::DimensionMismatch {
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// Create a table with the given columns and no rows.
    pub fn empty(columns: Vec<String>) -> Result<Self> {
        Self::new(columns, Vec::new())
    }

    /// Load a table from a delimited text file.
    pub fn from_csv<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(BufReader::new(file), options)
    }

    /// Load a table from any reader producing delimited text with a header row.
    pub fn from_csv_reader<R: Read>(reader: R, options: &CsvOptions) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let text_mask: Vec<bool> = columns
            .iter()
            .map(|c| options.text_columns.iter().any(|t| t == c))
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let row: Vec<Value> = record
                .iter()
                .zip(&text_mask)
                .map(|(field, &as_text)| {
                    if as_text {
                        Value::parse_text(field)
                    } else {
                        Value::parse(field)
                    }
                })
                .collect();
            rows.push(row);
        }

        Self::new(columns, rows)
    }

    /// Write the table as comma-separated text.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.to_csv_writer(BufWriter::new(file))
    }

    /// Write the table as comma-separated text to any writer.
    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Position of a column.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.index
            .get(column)
            .copied()
            .ok_or_else(|| HarmonizeError::MissingColumn(column.to_string()))
    }

    /// Column names as a set.
    pub fn column_set(&self) -> HashSet<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// Get a cell value.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = *self.index.get(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Get all values for a column.
    pub fn column(&self, column: &str) -> Result<Vec<&Value>> {
        let col = self.column_index(column)?;
        Ok(self.rows.iter().map(|r| &r[col]).collect())
    }

    /// Distinct non-missing keys of a column, in first-appearance order.
    pub fn distinct_keys(&self, column: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .column(column)?
            .into_iter()
            .filter_map(Value::key)
            .filter(|k| seen.insert(k.clone()))
            .collect())
    }

    /// Keys occurring more than once in a column, in first-repeat order.
    pub fn duplicate_keys(&self, column: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        Ok(self
            .column(column)?
            .into_iter()
            .filter_map(Value::key)
            .filter(|k| !seen.insert(k.clone()) && reported.insert(k.clone()))
            .collect())
    }

    /// Total number of missing cells.
    pub fn count_missing(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.iter().filter(|v| v.is_missing()).count())
            .sum()
    }

    /// Rename columns; names absent from `renames` are kept.
    pub fn rename_columns(&self, renames: &HashMap<String, String>) -> Result<Self> {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| renames.get(c).cloned().unwrap_or_else(|| c.clone()))
            .collect();
        Self::new(columns, self.rows.clone())
    }

    /// Keep only the named columns, in the given order.
    pub fn select_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self> {
        let positions = columns
            .iter()
            .map(|c| self.column_index(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let names = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| positions.iter().map(|&p| r[p].clone()).collect())
            .collect();
        Self::new(names, rows)
    }

    /// Keep only rows for which `keep` returns true.
    pub fn filter_rows<F>(&self, keep: F) -> Self
    where
        F: Fn(&[Value]) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            index: self.index.clone(),
            rows: self.rows.iter().filter(|r| keep(r.as_slice())).cloned().collect(),
        }
    }

    /// Keep only rows whose value in `column` satisfies `keep`.
    pub fn filter_by_column<F>(&self, column: &str, keep: F) -> Result<Self>
    where
        F: Fn(&Value) -> bool,
    {
        let col = self.column_index(column)?;
        Ok(self.filter_rows(|row| keep(&row[col])))
    }

    /// Replace every value of a column with `f(value)`.
    pub fn map_column<F>(&self, column: &str, f: F) -> Result<Self>
    where
        F: Fn(&Value) -> Value,
    {
        let col = self.column_index(column)?;
        let mut out = self.clone();
        for row in &mut out.rows {
            row[col] = f(&row[col]);
        }
        Ok(out)
    }

    /// Append a column holding the same value in every row.
    pub fn with_constant_column(&self, column: &str, value: Value) -> Result<Self> {
        let mut columns = self.columns.clone();
        columns.push(column.to_string());
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut row = r.clone();
                row.push(value.clone());
                row
            })
            .collect();
        Self::new(columns, rows)
    }

    /// Copy `columns` from `other` into this table, matching rows by subject key.
    ///
    /// Keys are compared numerically when they parse as numbers. Rows without
    /// a match get missing values; the first matching row of `other` is used.
    pub fn attach_columns<S: AsRef<str>>(
        &self,
        key_column: &str,
        other: &Table,
        other_key_column: &str,
        columns: &[S],
    ) -> Result<Self> {
        let key = self.column_index(key_column)?;
        let other_key = other.column_index(other_key_column)?;
        let sources = columns
            .iter()
            .map(|c| other.column_index(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut lookup: HashMap<String, usize> = HashMap::new();
        for (i, row) in other.rows.iter().enumerate() {
            if let Some(k) = row[other_key].numeric_key() {
                lookup.entry(k).or_insert(i);
            }
        }

        let mut names = self.columns.clone();
        names.extend(columns.iter().map(|c| c.as_ref().to_string()));
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let matched = row[key].numeric_key().and_then(|k| lookup.get(&k).copied());
                let mut out = row.clone();
                out.extend(sources.iter().map(|&s| match matched {
                    Some(m) => other.rows[m][s].clone(),
                    None => Value::Missing,
                }));
                out
            })
            .collect();
        Self::new(names, rows)
    }

    /// Drop rows containing any missing value.
    pub fn drop_incomplete_rows(&self) -> Self {
        self.filter_rows(|row| !row.iter().any(Value::is_missing))
    }

    /// Append the rows of `other`, matching columns by name.
    ///
    /// Both tables must have the same column set; `other`'s columns are
    /// reordered to this table's order.
    pub fn append(&mut self, other: &Table) -> Result<()> {
        if self.column_set() != other.column_set() {
            let mine = self.column_set();
            let theirs = other.column_set();
            return Err(HarmonizeError::SchemaMismatch {
                missing: sorted_difference(&mine, &theirs),
                unexpected: sorted_difference(&theirs, &mine),
            });
        }
        let positions = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect::<Result<Vec<_>>>()?;
        for row in &other.rows {
            self.rows
                .push(positions.iter().map(|&p| row[p].clone()).collect());
        }
        Ok(())
    }

    /// Inner join on a key column.
    ///
    /// Output rows follow this table's row order; each row is paired with every
    /// matching row of `other`. Non-key columns must not overlap.
    pub fn inner_join(&self, other: &Table, on: &str) -> Result<Self> {
        let left_key = self.column_index(on)?;
        let right_key = other.column_index(on)?;

        let mut right_rows: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in other.rows.iter().enumerate() {
            if let Some(k) = row[right_key].key() {
                right_rows.entry(k).or_default().push(i);
            }
        }

        let mut columns = self.columns.clone();
        columns.extend(
            other
                .columns
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != right_key)
                .map(|(_, c)| c.clone()),
        );

        let mut rows = Vec::new();
        for row in &self.rows {
            let Some(k) = row[left_key].key() else {
                continue;
            };
            if let Some(matches) = right_rows.get(&k) {
                for &m in matches {
                    let mut joined = row.clone();
                    joined.extend(
                        other.rows[m]
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| *i != right_key)
                            .map(|(_, v)| v.clone()),
                    );
                    rows.push(joined);
                }
            }
        }

        Self::new(columns, rows)
    }
}

/// A table tagged with the name of the source that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Source name (e.g. `"FS53"`, `"ANTs"`); used as the row label when merging.
    pub name: String,
    /// The table itself.
    pub table: Table,
}

impl Dataset {
    /// Create a named dataset.
    pub fn new(name: &str, table: Table) -> Self {
        Self {
            name: name.to_string(),
            table,
        }
    }
}

fn build_index(columns: &[String]) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(columns.len());
    for (i, c) in columns.iter().enumerate() {
        if index.insert(c.clone(), i).is_some() {
            return Err(HarmonizeError::DuplicateColumn(c.clone()));
        }
    }
    Ok(index)
}

pub(crate) fn sorted_difference(a: &HashSet<&str>, b: &HashSet<&str>) -> Vec<String> {
    let mut diff: Vec<String> = a.difference(b).map(|s| s.to_string()).collect();
    diff.sort();
    diff
}
