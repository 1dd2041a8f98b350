//! MoTeC Log Generator Core Library
//!
//! Converts heterogeneous vehicle-telemetry recordings (raw CAN-bus traces,
//! CSV exports, Accessport text logs, MCAP containers) into a single
//! MoTeC-style `.ld` file with a uniform time base and consistent channel
//! metadata.
//!
//! # Architecture
//!
//! The pipeline is strictly single-pass:
//!
//! 1. Signal catalog loading (`catalog`, CAN only)
//! 2. Format reading (`formats`) into timestamped raw records
//! 3. CAN frame decoding (`frame_decoder`, CAN only)
//! 4. Channel accumulation and resampling (`channels`)
//! 5. Binary encoding (`encoder`) and a single output write
//!
//! The library does NOT:
//! - Manage any user interface state
//! - Stream or decode in real time
//! - Merge multiple sessions
//!
//! All of that belongs to the application layer (motec-log-cli or a GUI).
//!
//! # Example Usage
//!
//! ```no_run
//! use motec_log_core::{generate, GenerateRequest, LogType, SessionMetadata};
//! use std::path::PathBuf;
//!
//! let request = GenerateRequest {
//!     log_path: PathBuf::from("session.log"),
//!     log_type: LogType::Can,
//!     dbc_path: Some(PathBuf::from("powertrain.dbc")),
//!     output_path: PathBuf::from("session.ld"),
//!     frequency_hz: 20.0,
//!     metadata: SessionMetadata {
//!         driver: Some("J. Hunt".to_string()),
//!         ..Default::default()
//!     },
//! };
//!
//! let output = generate(&request).unwrap();
//! println!("Wrote {:?}", output);
//! ```

// Public modules
pub mod catalog;
pub mod channels;
pub mod encoder;
pub mod formats;
pub mod frame_decoder;
pub mod generator;
pub mod trace;
pub mod types;

// Re-export main types for convenience
pub use channels::{ChannelStore, ResampledChannel, ResampledMatrix};
pub use generator::{generate, GenerateRequest};
pub use types::{
    GeneratorError, LogType, RawFrame, RawRecord, RawSample, Result, SessionMetadata,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: the store starts empty
        let store = ChannelStore::new();
        assert_eq!(store.num_channels(), 0);
        assert_eq!(store.num_samples(), 0);
    }
}
