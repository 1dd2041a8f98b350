//! CAN trace reader
//!
//! Parses plain-text CAN traces, one frame per line. Two line flavors are
//! auto-detected:
//!
//! - comma-separated records `timestamp_ms,frame_id_hex,length,payload_hex`
//!   as exported by dash loggers; timestamps are milliseconds and are
//!   converted to seconds at read time
//! - candump ASCII records `(timestamp_sec) iface ID#PAYLOAD` as written by
//!   `candump -l`; timestamps are already seconds

use crate::formats::LogReader;
use crate::types::{GeneratorError, RawFrame, RawRecord, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Classic CAN payload limit in bytes
const MAX_PAYLOAD: usize = 8;

/// Reader for plain-text CAN traces
pub struct CanTraceReader {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl LogReader for CanTraceReader {
    fn parse(path: &Path) -> Result<Self> {
        log::info!("Opening CAN trace: {:?}", path);
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for CanTraceReader {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Some(parse_trace_line(&line, self.line_no).map(RawRecord::Frame));
        }
    }
}

/// Parse one trace line in either supported flavor
pub fn parse_trace_line(line: &str, line_no: usize) -> Result<RawFrame> {
    let trimmed = line.trim();
    if trimmed.starts_with('(') {
        parse_candump_line(trimmed, line_no)
    } else {
        parse_csv_trace_line(trimmed, line_no)
    }
}

fn malformed(line_no: usize, reason: impl Into<String>) -> GeneratorError {
    GeneratorError::MalformedFrame {
        line: line_no,
        reason: reason.into(),
    }
}

/// Parse a comma-separated record `timestamp_ms,frame_id_hex,length,payload_hex`
fn parse_csv_trace_line(line: &str, line_no: usize) -> Result<RawFrame> {
    let mut fields = line.split(',');
    let (stamp, id, length, payload) = match (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) {
        (Some(a), Some(b), Some(c), Some(d)) => (a.trim(), b.trim(), c.trim(), d.trim()),
        _ => return Err(malformed(line_no, "expected 'timestamp,id,length,payload'")),
    };

    let timestamp_ms: f64 = stamp
        .parse()
        .map_err(|_| malformed(line_no, format!("non-numeric timestamp '{}'", stamp)))?;

    let frame_id = parse_frame_id(id)
        .ok_or_else(|| malformed(line_no, format!("non-hexadecimal identifier '{}'", id)))?;

    let declared_length: usize = length
        .parse()
        .map_err(|_| malformed(line_no, format!("non-numeric length '{}'", length)))?;
    if declared_length > MAX_PAYLOAD {
        return Err(malformed(
            line_no,
            format!("declared length {} exceeds classic CAN maximum of 8", declared_length),
        ));
    }

    let payload = parse_payload_hex(payload, line_no)?;
    if payload.len() < declared_length {
        return Err(malformed(
            line_no,
            format!(
                "payload has {} bytes but record declares {}",
                payload.len(),
                declared_length
            ),
        ));
    }

    // Source unit is milliseconds; the pipeline time base is seconds.
    Ok(RawFrame {
        timestamp: timestamp_ms / 1000.0,
        frame_id,
        length: declared_length,
        payload,
    })
}

/// Parse a candump record `(timestamp_sec) iface ID#PAYLOAD`
fn parse_candump_line(line: &str, line_no: usize) -> Result<RawFrame> {
    let mut fields = line.split_whitespace();
    let (stamp, _iface, msg) = match (fields.next(), fields.next(), fields.next()) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => return Err(malformed(line_no, "expected '(timestamp) iface id#payload'")),
    };

    let stamp = stamp
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| malformed(line_no, "timestamp is not parenthesized"))?;
    let timestamp: f64 = stamp
        .parse()
        .map_err(|_| malformed(line_no, format!("non-numeric timestamp '{}'", stamp)))?;

    let (id, payload) = msg
        .split_once('#')
        .ok_or_else(|| malformed(line_no, "record has no '#' separator"))?;
    let frame_id = parse_frame_id(id)
        .ok_or_else(|| malformed(line_no, format!("non-hexadecimal identifier '{}'", id)))?;

    let payload = parse_payload_hex(payload, line_no)?;
    let length = payload.len();

    Ok(RawFrame {
        timestamp,
        frame_id,
        length,
        payload,
    })
}

/// Parse a frame identifier, hex with optional `0x` prefix
fn parse_frame_id(field: &str) -> Option<u32> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Decode a hex payload string into bytes
fn parse_payload_hex(hex: &str, line_no: usize) -> Result<Vec<u8>> {
    if !hex.is_ascii() {
        return Err(malformed(line_no, format!("non-hexadecimal payload '{}'", hex)));
    }
    if hex.len() % 2 != 0 {
        return Err(malformed(line_no, format!("odd-length payload hex '{}'", hex)));
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| malformed(line_no, format!("non-hexadecimal payload '{}'", hex)))?;
        bytes.push(byte);
    }
    if bytes.len() > MAX_PAYLOAD {
        return Err(malformed(
            line_no,
            format!("payload has {} bytes, classic CAN carries at most 8", bytes.len()),
        ));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_csv_trace_line() {
        let frame = parse_trace_line("1698184253000,7E0,8,0102030405060708", 1).unwrap();
        assert_eq!(frame.timestamp, 1698184253.0);
        assert_eq!(frame.frame_id, 0x7E0);
        assert_eq!(frame.length, 8);
        assert_eq!(frame.payload, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_millisecond_conversion() {
        let frame = parse_trace_line("1500,123,2,ABCD", 1).unwrap();
        assert_eq!(frame.timestamp, 1.5);
    }

    #[test]
    fn test_parse_candump_line() {
        let frame = parse_trace_line("(1698184253.000000) can0 7E0#0102030405060708", 1).unwrap();
        assert_eq!(frame.timestamp, 1698184253.0);
        assert_eq!(frame.frame_id, 0x7E0);
        assert_eq!(frame.payload.len(), 8);
    }

    #[test]
    fn test_payload_shorter_than_declared_length() {
        let result = parse_trace_line("1000,7E0,8,0102", 3);
        assert!(matches!(
            result,
            Err(GeneratorError::MalformedFrame { line: 3, .. })
        ));
    }

    #[test]
    fn test_non_numeric_timestamp() {
        let result = parse_trace_line("abc,7E0,2,0102", 1);
        assert!(matches!(result, Err(GeneratorError::MalformedFrame { .. })));
    }

    #[test]
    fn test_non_hex_identifier() {
        let result = parse_trace_line("1000,XYZ,2,0102", 1);
        assert!(matches!(result, Err(GeneratorError::MalformedFrame { .. })));
    }

    #[test]
    fn test_oversized_payload() {
        let result = parse_trace_line("1000,7E0,8,010203040506070809", 1);
        assert!(matches!(result, Err(GeneratorError::MalformedFrame { .. })));
    }

    #[test]
    fn test_reader_preserves_source_order() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2000,100,1,AA").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "1000,101,1,BB").unwrap();
        file.flush().unwrap();

        let reader = CanTraceReader::parse(file.path()).unwrap();
        let records: Vec<_> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        // Out-of-order timestamps are accepted, not reordered
        assert_eq!(records[0].timestamp(), 2.0);
        assert_eq!(records[1].timestamp(), 1.0);
    }

    #[test]
    fn test_error_carries_line_number() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1000,100,1,AA").unwrap();
        writeln!(file, "not a frame").unwrap();
        file.flush().unwrap();

        let mut reader = CanTraceReader::parse(file.path()).unwrap();
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(GeneratorError::MalformedFrame { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedFrame, got {:?}", other),
        }
    }
}
