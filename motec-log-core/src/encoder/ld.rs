//! MoTeC i2 `.ld` file writer
//!
//! Serializes, in order: a fixed-layout file header, the event/venue/vehicle
//! metadata blocks, a doubly-linked channel descriptor table, and the dense
//! per-channel sample data. All integers are little-endian; strings are
//! NUL-padded fixed-width fields. Field widths and the magic constants
//! follow the published description of the format used by the target
//! analysis tool; they are not invented here.
//!
//! File layout:
//!
//! ```text
//! 0x0000  header        (1762 bytes)
//! 0x06E2  event block   (1154 bytes)
//! 0x0B64  venue block   (1100 bytes)
//! 0x0FB0  vehicle block  (260 bytes)
//! 0x10B4  channel descriptors (124 bytes each)
//!         channel data (one f32 array per channel, descriptor order)
//! ```

use crate::channels::ResampledMatrix;
use crate::types::{GeneratorError, Result, SessionMetadata};
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{DateTime, Local};

const HEADER_SIZE: usize = 1762;
const EVENT_SIZE: usize = 1154;
const VENUE_SIZE: usize = 1100;
const VEHICLE_SIZE: usize = 260;
const CHANNEL_META_SIZE: usize = 124;

const EVENT_PTR: u32 = HEADER_SIZE as u32;
const VENUE_PTR: u32 = EVENT_PTR + EVENT_SIZE as u32;
const VEHICLE_PTR: u32 = VENUE_PTR + VENUE_SIZE as u32;
const CHANNEL_META_PTR: u32 = VEHICLE_PTR + VEHICLE_SIZE as u32;

/// File marker at offset 0
const LD_MARKER: u32 = 0x40;
/// "Pro logging" magic expected by the analysis tool
const PRO_LOGGING_MAGIC: u32 = 0x000C_81A4;
/// Device identity the tool associates with this header revision
const DEVICE_SERIAL: u32 = 0x1F44;
const DEVICE_TYPE: &str = "ADL";
const DEVICE_VERSION: u16 = 420;

/// Per-channel counter base in the descriptor table
const CHANNEL_COUNTER_BASE: u16 = 0x2EE1;
/// Descriptor counters are u16, which bounds the channel count
pub const MAX_CHANNELS: usize = (u16::MAX - CHANNEL_COUNTER_BASE) as usize;

/// Datatype class/size for IEEE float samples
const DATATYPE_FLOAT: u16 = 0x07;
const DATATYPE_SIZE: u16 = 4;

/// Encode a resampled matrix plus session metadata into a complete `.ld`
/// byte buffer
///
/// The caller performs the single file write; nothing is written here, so a
/// failed encode leaves no partial artifact behind.
pub fn encode(
    matrix: &ResampledMatrix,
    metadata: &SessionMetadata,
    logged_at: DateTime<Local>,
) -> Result<Vec<u8>> {
    if matrix.channels.len() > MAX_CHANNELS {
        return Err(GeneratorError::EncodeError(format!(
            "channel count {} exceeds the format maximum of {}",
            matrix.channels.len(),
            MAX_CHANNELS
        )));
    }

    let frequency = matrix.frequency_hz.round();
    if (matrix.frequency_hz - frequency).abs() > 1e-6 || frequency < 1.0 || frequency > f64::from(u16::MAX) {
        return Err(GeneratorError::EncodeError(format!(
            "sample frequency {} Hz cannot be represented as a whole-Hz channel rate",
            matrix.frequency_hz
        )));
    }
    let frequency = frequency as u16;

    let num_channels = matrix.channels.len();
    let num_points = matrix.len();
    let data_start = CHANNEL_META_PTR as usize + num_channels * CHANNEL_META_SIZE;
    let total_size = data_start + num_channels * num_points * DATATYPE_SIZE as usize;
    if total_size > u32::MAX as usize {
        return Err(GeneratorError::EncodeError(format!(
            "encoded file size {} exceeds the format's 32-bit addressing",
            total_size
        )));
    }

    let mut out = Vec::with_capacity(total_size);
    write_header(&mut out, metadata, logged_at, num_channels as u32)?;
    write_event(&mut out, metadata)?;
    write_venue(&mut out, metadata)?;
    write_vehicle(&mut out, metadata)?;

    // Channel descriptor table, doubly linked through the meta pointers
    for (index, channel) in matrix.channels.iter().enumerate() {
        let meta_ptr = CHANNEL_META_PTR as usize + index * CHANNEL_META_SIZE;
        let prev_ptr = if index == 0 { 0 } else { meta_ptr - CHANNEL_META_SIZE };
        let next_ptr = if index + 1 == num_channels { 0 } else { meta_ptr + CHANNEL_META_SIZE };
        let data_ptr = data_start + index * num_points * DATATYPE_SIZE as usize;

        out.write_u32::<LittleEndian>(prev_ptr as u32)?;
        out.write_u32::<LittleEndian>(next_ptr as u32)?;
        out.write_u32::<LittleEndian>(data_ptr as u32)?;
        out.write_u32::<LittleEndian>(num_points as u32)?;
        out.write_u16::<LittleEndian>(CHANNEL_COUNTER_BASE + index as u16)?;
        out.write_u16::<LittleEndian>(DATATYPE_FLOAT)?;
        out.write_u16::<LittleEndian>(DATATYPE_SIZE)?;
        out.write_u16::<LittleEndian>(frequency)?;
        // Samples are pre-scaled physical values: identity scaling quad
        out.write_i16::<LittleEndian>(0)?; // shift
        out.write_i16::<LittleEndian>(1)?; // mul
        out.write_i16::<LittleEndian>(1)?; // scale
        out.write_i16::<LittleEndian>(0)?; // decimal places
        write_string(&mut out, Some(&channel.name), 32, "channel name")?;
        write_truncated(&mut out, &channel.name, 8);
        write_string(&mut out, channel.unit.as_deref(), 12, "channel unit")?;
        write_padding(&mut out, 40);
    }

    // Dense sample data in descriptor order
    for channel in &matrix.channels {
        for &value in &channel.values {
            out.write_f32::<LittleEndian>(value as f32)?;
        }
    }

    debug_assert_eq!(out.len(), total_size);
    Ok(out)
}

/// Write the 1762-byte file header
fn write_header(
    out: &mut Vec<u8>,
    metadata: &SessionMetadata,
    logged_at: DateTime<Local>,
    num_channels: u32,
) -> Result<()> {
    let data_ptr = CHANNEL_META_PTR + num_channels * CHANNEL_META_SIZE as u32;

    out.write_u32::<LittleEndian>(LD_MARKER)?;
    write_padding(out, 4);
    out.write_u32::<LittleEndian>(if num_channels > 0 { CHANNEL_META_PTR } else { 0 })?;
    out.write_u32::<LittleEndian>(data_ptr)?;
    write_padding(out, 20);
    out.write_u32::<LittleEndian>(EVENT_PTR)?;
    write_padding(out, 24);
    out.write_u16::<LittleEndian>(1)?;
    out.write_u16::<LittleEndian>(0x4240)?;
    out.write_u16::<LittleEndian>(0x000F)?;
    out.write_u32::<LittleEndian>(DEVICE_SERIAL)?;
    write_string(out, Some(DEVICE_TYPE), 8, "device type")?;
    out.write_u16::<LittleEndian>(DEVICE_VERSION)?;
    out.write_u16::<LittleEndian>(0xADB0)?;
    out.write_u32::<LittleEndian>(num_channels)?;
    write_padding(out, 4);
    write_string(out, Some(&logged_at.format("%d/%m/%Y").to_string()), 16, "date")?;
    write_padding(out, 16);
    write_string(out, Some(&logged_at.format("%H:%M:%S").to_string()), 16, "time")?;
    write_padding(out, 16);
    write_string(out, metadata.driver.as_deref(), 64, "driver")?;
    write_string(out, metadata.vehicle_id.as_deref(), 64, "vehicle id")?;
    write_padding(out, 64);
    write_string(out, metadata.venue_name.as_deref(), 64, "venue name")?;
    write_padding(out, 64);
    write_padding(out, 1024);
    out.write_u32::<LittleEndian>(PRO_LOGGING_MAGIC)?;
    write_padding(out, 66);
    write_string(out, metadata.short_comment.as_deref(), 64, "short comment")?;
    write_padding(out, 126);

    debug_assert_eq!(out.len(), HEADER_SIZE);
    Ok(())
}

/// Write the 1154-byte event block
fn write_event(out: &mut Vec<u8>, metadata: &SessionMetadata) -> Result<()> {
    let start = out.len();
    write_string(out, metadata.event_name.as_deref(), 64, "event name")?;
    write_string(out, metadata.event_session.as_deref(), 64, "event session")?;
    write_string(out, metadata.long_comment.as_deref(), 1024, "long comment")?;
    out.write_u16::<LittleEndian>(VENUE_PTR as u16)?;
    debug_assert_eq!(out.len() - start, EVENT_SIZE);
    Ok(())
}

/// Write the 1100-byte venue block
fn write_venue(out: &mut Vec<u8>, metadata: &SessionMetadata) -> Result<()> {
    let start = out.len();
    write_string(out, metadata.venue_name.as_deref(), 64, "venue name")?;
    write_padding(out, 1034);
    out.write_u16::<LittleEndian>(VEHICLE_PTR as u16)?;
    debug_assert_eq!(out.len() - start, VENUE_SIZE);
    Ok(())
}

/// Write the 260-byte vehicle block
fn write_vehicle(out: &mut Vec<u8>, metadata: &SessionMetadata) -> Result<()> {
    let start = out.len();
    write_string(out, metadata.vehicle_id.as_deref(), 64, "vehicle id")?;
    write_padding(out, 128);
    out.write_u32::<LittleEndian>(metadata.vehicle_weight.unwrap_or(0))?;
    write_string(out, metadata.vehicle_type.as_deref(), 32, "vehicle type")?;
    write_string(out, metadata.vehicle_comment.as_deref(), 32, "vehicle comment")?;
    debug_assert_eq!(out.len() - start, VEHICLE_SIZE);
    Ok(())
}

/// Write a NUL-padded fixed-width string field
///
/// An unset value writes an all-NUL field; a value longer than the field is
/// an encode error, never a silent truncation.
fn write_string(out: &mut Vec<u8>, value: Option<&str>, width: usize, field: &str) -> Result<()> {
    let bytes = value.map(str::as_bytes).unwrap_or(&[]);
    if bytes.len() > width {
        return Err(GeneratorError::EncodeError(format!(
            "{} '{}' is {} bytes, the format allows {}",
            field,
            value.unwrap_or_default(),
            bytes.len(),
            width
        )));
    }
    out.extend_from_slice(bytes);
    write_padding(out, width - bytes.len());
    Ok(())
}

/// Write a NUL-padded field, truncating the value to fit
///
/// Only used for the 8-byte short name, which is display shorthand.
fn write_truncated(out: &mut Vec<u8>, value: &str, width: usize) {
    let mut end = value.len().min(width);
    // Back off to a character boundary
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    out.extend_from_slice(value[..end].as_bytes());
    write_padding(out, width - end);
}

fn write_padding(out: &mut Vec<u8>, len: usize) {
    out.resize(out.len() + len, 0);
}
