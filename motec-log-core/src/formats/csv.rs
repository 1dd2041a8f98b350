//! CSV log reader
//!
//! Interprets a generic CSV export: one column per named channel, one row
//! per sample time. The time column is found by name (`time`/`timestamp`,
//! case-insensitive) and falls back to the first column. Units are parsed
//! from `Name (unit)` or `Name [unit]` headers; a time unit of `(ms)` is
//! converted to seconds at read time.

use crate::formats::LogReader;
use crate::types::{GeneratorError, RawRecord, RawSample, Result};
use std::fs::File;
use std::path::Path;

/// One value column of the CSV file
struct Column {
    name: String,
    unit: Option<String>,
}

/// Reader for generic CSV channel exports
pub struct CsvReader {
    records: csv::StringRecordsIntoIter<File>,
    columns: Vec<Option<Column>>,
    time_index: usize,
    time_divisor: f64,
    /// Samples from the current row not yet handed out
    pending: Vec<RawSample>,
    line_no: usize,
}

impl LogReader for CsvReader {
    fn parse(path: &Path) -> Result<Self> {
        log::info!("Opening CSV log: {:?}", path);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| csv_error(e, 1))?;

        let headers = reader.headers().map_err(|e| csv_error(e, 1))?.clone();
        if headers.is_empty() {
            return Err(GeneratorError::MalformedRecord {
                line: 1,
                reason: "CSV file has no header row".to_string(),
            });
        }

        let time_index = find_time_column(&headers);
        let (_, time_unit) = split_header(&headers[time_index]);
        let time_divisor = match time_unit.as_deref() {
            Some("ms") => 1000.0,
            _ => 1.0,
        };

        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                if i == time_index || header.is_empty() {
                    None
                } else {
                    let (name, unit) = split_header(header);
                    Some(Column { name, unit })
                }
            })
            .collect();

        Ok(Self {
            records: reader.into_records(),
            columns,
            time_index,
            time_divisor,
            pending: Vec::new(),
            line_no: 1,
        })
    }
}

impl Iterator for CsvReader {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sample) = self.pending.pop() {
                return Some(Ok(RawRecord::Sample(sample)));
            }

            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(csv_error(e, self.line_no + 1))),
            };
            self.line_no += 1;

            if let Err(e) = self.buffer_row(&record) {
                return Some(Err(e));
            }
        }
    }
}

impl CsvReader {
    /// Turn one CSV row into pending samples, one per non-empty value cell
    fn buffer_row(&mut self, record: &csv::StringRecord) -> Result<()> {
        let time_cell = record.get(self.time_index).unwrap_or("");
        let timestamp: f64 = time_cell.parse().map_err(|_| GeneratorError::MalformedRecord {
            line: self.line_no,
            reason: format!("non-numeric time value '{}'", time_cell),
        })?;
        let timestamp = timestamp / self.time_divisor;

        // Buffered in reverse so pop() hands samples out in column order
        for (i, column) in self.columns.iter().enumerate().rev() {
            let column = match column {
                Some(column) => column,
                None => continue,
            };
            let cell = match record.get(i) {
                Some(cell) if !cell.is_empty() => cell,
                _ => continue, // channel simply has no sample at this time
            };

            let value: f64 = cell.parse().map_err(|_| GeneratorError::MalformedRecord {
                line: self.line_no,
                reason: format!("non-numeric value '{}' in column '{}'", cell, column.name),
            })?;

            self.pending.push(RawSample {
                timestamp,
                channel: column.name.clone(),
                value,
                unit: column.unit.clone(),
            });
        }

        Ok(())
    }
}

fn csv_error(e: csv::Error, line: usize) -> GeneratorError {
    GeneratorError::MalformedRecord {
        line,
        reason: e.to_string(),
    }
}

/// Find the time column by name, falling back to the first column
fn find_time_column(headers: &csv::StringRecord) -> usize {
    headers
        .iter()
        .position(|h| {
            let (name, _) = split_header(h);
            matches!(name.to_ascii_lowercase().as_str(), "time" | "timestamp")
        })
        .unwrap_or(0)
}

/// Split a header cell into channel name and optional trailing unit,
/// accepting `Name (unit)` and `Name [unit]`
pub(crate) fn split_header(header: &str) -> (String, Option<String>) {
    let header = header.trim();
    for (open, close) in [('(', ')'), ('[', ']')] {
        if let Some(start) = header.rfind(open) {
            if header.ends_with(close) && start > 0 {
                let name = header[..start].trim();
                let unit = header[start + 1..header.len() - 1].trim();
                if !name.is_empty() && !unit.is_empty() {
                    return (name.to_string(), Some(unit.to_string()));
                }
            }
        }
    }
    (header.to_string(), None)
}
