//! Conversion entry point
//!
//! Wires the pipeline together: catalog loading, format reading, frame
//! decoding (CAN only), channel accumulation, resampling, and the single
//! output write. One invocation owns all of its intermediate state, so
//! parallel invocations targeting distinct output paths need no
//! synchronization.

use crate::catalog::{self, SignalCatalog};
use crate::channels::ChannelStore;
use crate::encoder;
use crate::formats::{
    AccessportReader, CanTraceReader, CsvReader, LogReader, McapReader,
};
use crate::frame_decoder::decode_frame;
use crate::types::{GeneratorError, LogType, RawRecord, Result, SessionMetadata};
use std::path::{Path, PathBuf};

/// Everything one conversion needs
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Input log file
    pub log_path: PathBuf,
    /// Input format
    pub log_type: LogType,
    /// DBC signal catalog, required iff `log_type` is CAN
    pub dbc_path: Option<PathBuf>,
    /// Output `.ld` file
    pub output_path: PathBuf,
    /// Target sample frequency in Hz
    pub frequency_hz: f64,
    /// Session metadata embedded in the output header
    pub metadata: SessionMetadata,
}

/// Run the full conversion pipeline
///
/// Fails fast on the first error; nothing readable is left at the output
/// path on failure. Returns the output path on success.
pub fn generate(request: &GenerateRequest) -> Result<PathBuf> {
    log::info!(
        "Converting {} log {:?} -> {:?} at {} Hz",
        request.log_type,
        request.log_path,
        request.output_path,
        request.frequency_hz
    );

    if !request.frequency_hz.is_finite() || request.frequency_hz <= 0.0 {
        return Err(GeneratorError::InvalidFrequency(request.frequency_hz));
    }

    // A CAN trace is undecodable without its catalog; fail before any read
    let catalog = match (request.log_type, request.dbc_path.as_deref()) {
        (LogType::Can, None) => return Err(GeneratorError::MissingCatalog),
        (LogType::Can, Some(dbc_path)) => Some(catalog::load_catalog(dbc_path)?),
        _ => None,
    };

    let mut store = ChannelStore::new();
    match request.log_type {
        LogType::Can => {
            let reader = CanTraceReader::parse(&request.log_path)?;
            accumulate(reader, catalog.as_ref(), &mut store)?;
        }
        LogType::Csv => {
            let reader = CsvReader::parse(&request.log_path)?;
            accumulate(reader, None, &mut store)?;
        }
        LogType::Accessport => {
            let reader = AccessportReader::parse(&request.log_path)?;
            accumulate(reader, None, &mut store)?;
        }
        LogType::Mcap => {
            let reader = McapReader::parse(&request.log_path)?;
            accumulate(reader, None, &mut store)?;
        }
    }

    log::info!(
        "Accumulated {} samples across {} channels",
        store.num_samples(),
        store.num_channels()
    );

    let matrix = store.resample(request.frequency_hz)?;
    let encoded = encoder::encode(&matrix, &request.metadata, chrono::Local::now())?;

    write_artifact(&request.output_path, &encoded)?;
    log::info!(
        "Wrote {} channels, {} samples per channel, {} bytes",
        matrix.channels.len(),
        matrix.len(),
        encoded.len()
    );

    Ok(request.output_path.clone())
}

/// Drain a reader into the channel store, decoding CAN frames on the way
fn accumulate(
    reader: impl Iterator<Item = Result<RawRecord>>,
    catalog: Option<&SignalCatalog>,
    store: &mut ChannelStore,
) -> Result<()> {
    for record in reader {
        match record? {
            RawRecord::Sample(sample) => store.push(sample),
            RawRecord::Frame(frame) => {
                let signals = catalog.and_then(|c| c.signals_for(frame.frame_id));
                match signals {
                    Some(signals) => {
                        for sample in decode_frame(&frame, signals)? {
                            store.push(sample);
                        }
                    }
                    None => {
                        // Frames with no declared signals carry no usable
                        // information
                        log::debug!("Dropping frame 0x{:X} with no catalog entry", frame.frame_id);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Write the fully encoded artifact in one pass
///
/// The buffer is complete before the file is opened; if the write itself
/// fails the partial file is removed so no readable-but-wrong artifact
/// remains.
fn write_artifact(path: &Path, encoded: &[u8]) -> Result<()> {
    if let Err(e) = std::fs::write(path, encoded) {
        let _ = std::fs::remove_file(path);
        return Err(e.into());
    }
    Ok(())
}
