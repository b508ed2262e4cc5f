//! Data structures for ROI harmonization.

mod table;
mod value;

pub use table::{CsvOptions, Dataset, Table};
pub(crate) use table::sorted_difference;
pub use value::{Value, MISSING_TOKENS};
