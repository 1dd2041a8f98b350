//! Cobb Accessport log reader
//!
//! Accessport exports are CSV-shaped text files with a vendor preamble
//! before the real header row and occasional info columns ("AP Info") mixed
//! into the data. Unrecognized fields are ignorable, not fatal: string
//! cells are skipped, only a file without a recognizable header row is
//! rejected.

use crate::formats::LogReader;
use crate::types::{GeneratorError, RawRecord, RawSample, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use super::csv::split_header;

/// One value column of the vendor log
struct Column {
    name: String,
    unit: Option<String>,
}

/// Reader for Cobb Accessport text logs
pub struct AccessportReader {
    lines: Lines<BufReader<File>>,
    columns: Vec<Option<Column>>,
    time_index: usize,
    pending: Vec<RawSample>,
    line_no: usize,
}

impl LogReader for AccessportReader {
    fn parse(path: &Path) -> Result<Self> {
        log::info!("Opening Accessport log: {:?}", path);
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();

        // Scan past the vendor preamble for the header row
        let mut line_no = 0;
        let (header_line, header_no) = loop {
            let line = match lines.next() {
                Some(line) => line?,
                None => {
                    return Err(GeneratorError::MalformedRecord {
                        line: line_no,
                        reason: "no header row with a Time column found".to_string(),
                    })
                }
            };
            line_no += 1;

            if line.split(',').any(|cell| {
                let (name, _) = split_header(cell);
                name.eq_ignore_ascii_case("time")
            }) {
                break (line, line_no);
            }

            if line_no > 32 {
                return Err(GeneratorError::MalformedRecord {
                    line: line_no,
                    reason: "no header row with a Time column found".to_string(),
                });
            }
        };

        let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();
        let time_index = headers
            .iter()
            .position(|h| split_header(h).0.eq_ignore_ascii_case("time"))
            .unwrap_or(0);

        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                // Info columns carry vendor strings, not channel data
                if i == time_index || header.is_empty() || header.contains("AP Info") {
                    None
                } else {
                    let (name, unit) = split_header(header);
                    Some(Column { name, unit })
                }
            })
            .collect();

        Ok(Self {
            lines,
            columns,
            time_index,
            pending: Vec::new(),
            line_no: header_no,
        })
    }
}

impl Iterator for AccessportReader {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sample) = self.pending.pop() {
                return Some(Ok(RawRecord::Sample(sample)));
            }

            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }
            self.buffer_row(&line);
        }
    }
}

impl AccessportReader {
    /// Buffer the numeric cells of one row; everything unparseable is skipped
    fn buffer_row(&mut self, line: &str) {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();

        let timestamp: f64 = match cells.get(self.time_index).and_then(|c| c.parse().ok()) {
            Some(t) => t,
            None => {
                log::debug!("Skipping row {} without a numeric time cell", self.line_no);
                return;
            }
        };

        for (i, column) in self.columns.iter().enumerate().rev() {
            let column = match column {
                Some(column) => column,
                None => continue,
            };
            let value: f64 = match cells.get(i).and_then(|c| c.parse().ok()) {
                Some(v) => v,
                None => continue, // vendor string or placeholder cell
            };

            self.pending.push(RawSample {
                timestamp,
                channel: column.name.clone(),
                value,
                unit: column.unit.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_log(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn collect_samples(reader: AccessportReader) -> Vec<RawSample> {
        reader
            .map(|r| match r.unwrap() {
                RawRecord::Sample(s) => s,
                other => panic!("unexpected record {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_vendor_preamble_skipped() {
        let file = write_log(
            "AP Datalog Export\n\
             Firmware v1.2.3\n\
             Time (sec),AP Info,RPM (RPM),Boost (psi)\n\
             0.00,,800,0.1\n\
             0.05,cruise,850,0.2\n",
        );
        let samples = collect_samples(AccessportReader::parse(file.path()).unwrap());

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].channel, "RPM");
        assert_eq!(samples[0].value, 800.0);
        assert_eq!(samples[0].unit, Some("RPM".to_string()));
        assert_eq!(samples[1].channel, "Boost");
        assert_eq!(samples[3].timestamp, 0.05);
    }

    #[test]
    fn test_non_numeric_cells_ignored_not_fatal() {
        let file = write_log(
            "Time (sec),RPM (RPM)\n\
             0.00,800\n\
             0.05,-\n\
             0.10,900\n",
        );
        let samples = collect_samples(AccessportReader::parse(file.path()).unwrap());
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].value, 900.0);
    }

    #[test]
    fn test_file_without_header_rejected() {
        let file = write_log("just some text\nwith no header\n");
        let result = AccessportReader::parse(file.path());
        assert!(matches!(result, Err(GeneratorError::MalformedRecord { .. })));
    }
}
