//! Candump trace utilities
//!
//! Conversions between the plain-text CAN trace flavors that show up around
//! the pipeline: dash-logger CSV traces, human-readable candump output
//! (`candump -ta`) and the replayable candump log flavor (`candump -l`)
//! that `canplayer` consumes.

use crate::formats::can::parse_trace_line;
use crate::types::{GeneratorError, RawFrame, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Convert a dash-logger CSV trace to a replayable candump log
///
/// Each input record `timestamp_ms,frame_id_hex,length,payload_hex` becomes
/// one line `(<sec %.6f>) can0 <ID>#<PAYLOAD>`, with the identifier in
/// uppercase hex zero-padded to three digits. Returns the number of frames
/// written.
pub fn trace_to_candump(input: &Path, output: &Path) -> Result<usize> {
    log::info!("Converting trace {:?} to candump log {:?}", input, output);

    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let mut frames = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = parse_trace_line(&line, index + 1)?;
        writeln!(writer, "{}", format_candump_line(&frame))?;
        frames += 1;
    }

    writer.flush()?;
    log::info!("Wrote {} frames", frames);
    Ok(frames)
}

/// Convert a human-readable candump (`-ta` flavor) into the replayable
/// `-l` flavor
///
/// Input lines look like `(stamp) iface ID [len] B0 B1 ...`; output lines
/// are `(stamp) iface ID#B0B1...`. Returns the number of frames written.
pub fn normalize_candump(input: &Path, output: &Path) -> Result<usize> {
    log::info!("Normalizing candump {:?} into {:?}", input, output);

    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let mut frames = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(GeneratorError::MalformedRecord {
                line: index + 1,
                reason: "expected '(stamp) iface id [len] payload...'".to_string(),
            });
        }

        let payload: String = fields[4..].concat();
        writeln!(writer, "{} {} {}#{}", fields[0], fields[1], fields[2], payload)?;
        frames += 1;
    }

    writer.flush()?;
    log::info!("Wrote {} frames", frames);
    Ok(frames)
}

/// Format one frame as a replayable candump line
fn format_candump_line(frame: &RawFrame) -> String {
    let id = format!("{:X}", frame.frame_id);
    let payload: String = frame.payload.iter().map(|b| format!("{:02X}", b)).collect();
    format!("({:.6}) can0 {:0>3}#{}", frame.timestamp, id, payload)
}
