//! Core types for the log conversion pipeline
//!
//! This module defines the fundamental types that flow between the pipeline
//! stages: raw frames and samples from the format readers, session metadata
//! attached to the output file, and the error taxonomy for the whole crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Supported input log formats
///
/// Adding a format means adding a variant here and a reader in `formats/`,
/// not a string comparison scattered across callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogType {
    /// Raw CAN-bus trace (comma-separated or candump ASCII), decoded via a DBC catalog
    Can,
    /// Generic CSV export, one column per channel
    Csv,
    /// Cobb Accessport text log
    Accessport,
    /// MCAP container with JSON-encoded messages
    Mcap,
}

impl FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_uppercase().as_str() {
            "CAN" => Ok(LogType::Can),
            "CSV" => Ok(LogType::Csv),
            "ACCESSPORT" => Ok(LogType::Accessport),
            "MCAP" => Ok(LogType::Mcap),
            other => Err(format!(
                "unknown log type '{}' (expected CAN, CSV, ACCESSPORT or MCAP)",
                other
            )),
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogType::Can => write!(f, "CAN"),
            LogType::Csv => write!(f, "CSV"),
            LogType::Accessport => write!(f, "ACCESSPORT"),
            LogType::Mcap => write!(f, "MCAP"),
        }
    }
}

/// Raw CAN frame as read from a trace file, before signal decoding
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Timestamp in seconds, relative to the source's own epoch
    pub timestamp: f64,
    /// CAN message ID (11-bit or 29-bit)
    pub frame_id: u32,
    /// Declared data length code from the source record
    pub length: usize,
    /// Frame payload bytes (0-8 bytes for classic CAN)
    pub payload: Vec<u8>,
}

/// A single named sample - the common unit produced by the non-CAN readers
/// and by the CAN frame decoder
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Timestamp in seconds
    pub timestamp: f64,
    /// Channel name (unique per measured quantity)
    pub channel: String,
    /// Physical value
    pub value: f64,
    /// Engineering unit (e.g., "rpm", "km/h")
    pub unit: Option<String>,
}

/// One record emitted by a format reader
///
/// The CAN trace reader emits frames that still need signal decoding; every
/// other reader emits already-named samples.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Frame(RawFrame),
    Sample(RawSample),
}

impl RawRecord {
    /// Get the timestamp of this record in seconds
    pub fn timestamp(&self) -> f64 {
        match self {
            RawRecord::Frame(frame) => frame.timestamp,
            RawRecord::Sample(sample) => sample.timestamp,
        }
    }
}

/// Descriptive session information attached once per output file
///
/// All fields are optional; absence is `None`, never an empty-string or
/// zero sentinel. The field set matches the metadata the target analysis
/// tool displays for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub driver: Option<String>,
    pub vehicle_id: Option<String>,
    pub vehicle_weight: Option<u32>,
    pub vehicle_type: Option<String>,
    pub vehicle_comment: Option<String>,
    pub venue_name: Option<String>,
    pub event_name: Option<String>,
    pub event_session: Option<String>,
    pub long_comment: Option<String>,
    pub short_comment: Option<String>,
}

/// Errors that can occur during conversion
///
/// Every stage fails fast on the first error in its input; the variants
/// carry enough context (line number, signal name, frame id) to diagnose
/// a failure without re-running.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Failed to parse signal catalog: {0}")]
    CatalogError(String),

    #[error("CAN log selected but no DBC catalog was provided")]
    MissingCatalog,

    #[error("Malformed CAN frame at line {line}: {reason}")]
    MalformedFrame { line: usize, reason: String },

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error(
        "Signal '{signal}' (start bit {start_bit}, length {length}) exceeds the {payload_len}-byte payload of frame 0x{frame_id:X}"
    )]
    BitRangeOverflow {
        signal: String,
        frame_id: u32,
        start_bit: usize,
        length: usize,
        payload_len: usize,
    },

    #[error("No channel received any samples")]
    EmptyChannelSet,

    #[error("Invalid sample frequency: {0} Hz")]
    InvalidFrequency(f64),

    #[error("Failed to encode output: {0}")]
    EncodeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_type_from_str() {
        assert_eq!("CAN".parse::<LogType>().unwrap(), LogType::Can);
        assert_eq!("csv".parse::<LogType>().unwrap(), LogType::Csv);
        assert_eq!("AccessPort".parse::<LogType>().unwrap(), LogType::Accessport);
        assert_eq!("mcap".parse::<LogType>().unwrap(), LogType::Mcap);
        assert!("BLF".parse::<LogType>().is_err());
    }

    #[test]
    fn test_metadata_defaults_to_unset() {
        let metadata = SessionMetadata::default();
        assert_eq!(metadata.driver, None);
        assert_eq!(metadata.vehicle_weight, None);
        assert_eq!(metadata.short_comment, None);
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = GeneratorError::MalformedFrame {
            line: 42,
            reason: "non-hexadecimal identifier".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("line 42"));
        assert!(msg.contains("non-hexadecimal identifier"));

        let err = GeneratorError::BitRangeOverflow {
            signal: "EngineSpeed".to_string(),
            frame_id: 0x7E0,
            start_bit: 56,
            length: 16,
            payload_len: 8,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("EngineSpeed"));
        assert!(msg.contains("0x7E0"));
    }
}
