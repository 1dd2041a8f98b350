//! Log file format readers (CAN trace, CSV, Accessport, MCAP)
//!
//! Each reader turns its raw input into an ordered sequence of `RawRecord`s:
//! raw CAN frames for the CAN trace reader, already-named samples for the
//! rest. Readers never reorder records; reordering, if needed, is the
//! resampler's job.

use crate::types::{RawRecord, Result};
use std::path::Path;

pub mod accessport;
pub mod can;
pub mod csv;
pub mod mcap;

// Re-export reader types
pub use accessport::AccessportReader;
pub use can::CanTraceReader;
pub use csv::CsvReader;
pub use mcap::McapReader;

/// Common trait for all log file readers
///
/// Each reader is an iterator over records in source order; parse errors
/// surface as the iterator's error items and abort the pipeline.
pub trait LogReader: Iterator<Item = Result<RawRecord>> + Sized {
    /// Open a log file and return an iterator over its records
    fn parse(path: &Path) -> Result<Self>;
}
