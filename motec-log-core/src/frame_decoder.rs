//! Frame decoding engine
//!
//! Extracts signal values from raw CAN frames based on the signal catalog.
//! Handles bit extraction, endianness, sign extension, and physical value
//! conversion.

use crate::catalog::{ByteOrder, SignalDefinition, ValueType};
use crate::types::{GeneratorError, RawFrame, RawSample, Result};

/// Decode all catalog signals of a frame into named samples
///
/// Emits one sample per signal, timestamped with the frame's timestamp.
/// Fails with `BitRangeOverflow` when a signal's declared bit range exceeds
/// the actual payload of this frame - possible even after catalog
/// validation, since payload length is per-frame.
pub fn decode_frame(frame: &RawFrame, signals: &[SignalDefinition]) -> Result<Vec<RawSample>> {
    let mut samples = Vec::with_capacity(signals.len());

    for signal in signals {
        let raw_value = extract_signal_value(&frame.payload, signal).ok_or_else(|| {
            GeneratorError::BitRangeOverflow {
                signal: signal.name.clone(),
                frame_id: frame.frame_id,
                start_bit: signal.start_bit,
                length: signal.length,
                payload_len: frame.payload.len(),
            }
        })?;

        // Apply physical value conversion (factor and offset)
        let physical_value = raw_value as f64 * signal.factor + signal.offset;

        samples.push(RawSample {
            timestamp: frame.timestamp,
            channel: signal.name.clone(),
            value: physical_value,
            unit: signal.unit.clone(),
        });
    }

    Ok(samples)
}

/// Extract the raw integer value of a signal from frame payload bytes
///
/// Returns `None` when the bit range does not fit the payload.
fn extract_signal_value(data: &[u8], signal: &SignalDefinition) -> Option<i64> {
    let start_bit = signal.start_bit;
    let length = signal.length;

    // Validate signal fits within data
    if start_bit + length > data.len() * 8 {
        return None;
    }

    // Extract raw bits based on byte order
    let raw_value = match signal.byte_order {
        ByteOrder::LittleEndian => extract_little_endian(data, start_bit, length),
        ByteOrder::BigEndian => extract_big_endian(data, start_bit, length),
    };

    // Apply sign extension if needed
    let signed_value = match signal.value_type {
        ValueType::Unsigned => raw_value as i64,
        ValueType::Signed => sign_extend(raw_value, length),
    };

    Some(signed_value)
}

/// Extract signal with little-endian (Intel) byte order
///
/// Little-endian format:
/// - Start bit points to the LSB (least significant bit)
/// - Bits are numbered from LSB to MSB within each byte
/// - Byte 0 is the first byte in the CAN frame
fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;

    for i in 0..length {
        let bit_pos = start_bit + i;
        let byte_idx = bit_pos / 8;
        let bit_in_byte = bit_pos % 8;

        let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
        result |= (bit_value as u64) << i;
    }

    result
}

/// Extract signal with big-endian (Motorola) byte order
///
/// Big-endian format in CAN:
/// - Start bit points to the MSB (most significant bit) of the signal
/// - Bit numbering: bit 0 = MSB of byte 0, bit 7 = LSB of byte 0
/// - Signal grows downward (towards higher bit numbers)
fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;

    for i in 0..length {
        let bit_pos = start_bit + i;
        let byte_idx = bit_pos / 8;
        let bit_in_byte = 7 - (bit_pos % 8); // Bit 0 = MSB, bit 7 = LSB

        let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
        result |= (bit_value as u64) << (length - 1 - i);
    }

    result
}

/// Sign-extend a value from N bits to 64 bits
///
/// If the value's MSB is 1, fill the upper bits with 1s.
fn sign_extend(value: u64, bit_length: usize) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }

    let sign_bit = 1u64 << (bit_length - 1);
    if (value & sign_bit) != 0 {
        // Negative value - sign extend
        let mask = !0u64 << bit_length;
        (value | mask) as i64
    } else {
        // Positive value
        value as i64
    }
}
