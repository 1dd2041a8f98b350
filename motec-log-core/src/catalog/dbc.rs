//! DBC file parser
//!
//! Parses Vector DBC files with the `can-dbc` crate and converts them into
//! the internal signal catalog, validating the layout invariants on the way.

use crate::catalog::{
    ByteOrder, FrameDefinition, SignalCatalog, SignalDefinition, ValueType,
};
use crate::types::{GeneratorError, Result};
use std::path::Path;

/// Parse a DBC file into a validated signal catalog
pub fn load_catalog(path: &Path) -> Result<SignalCatalog> {
    log::info!("Parsing DBC file: {:?}", path);

    // Read the DBC file as bytes first (handle non-UTF8 encodings)
    let bytes = std::fs::read(path).map_err(|e| {
        GeneratorError::CatalogError(format!("Failed to read file {:?}: {}", path, e))
    })?;

    // Try UTF-8 first, then fall back to Latin-1 (compatible with Windows-1252)
    let dbc_content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("DBC file is not UTF-8, trying Latin-1 encoding");
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    // Parse using can-dbc crate
    let dbc = can_dbc::DBC::from_slice(dbc_content.as_bytes()).map_err(|e| {
        GeneratorError::CatalogError(format!("Failed to parse DBC file {:?}: {:?}", path, e))
    })?;

    let mut catalog = SignalCatalog::new();
    for dbc_msg in dbc.messages() {
        catalog.add_frame(convert_frame(dbc_msg)?)?;
    }

    let stats = catalog.stats();
    log::info!(
        "Parsed {} frames with {} signals from {:?}",
        stats.num_frames,
        stats.num_signals,
        path
    );

    Ok(catalog)
}

/// Convert a can-dbc message to our FrameDefinition
fn convert_frame(dbc_msg: &can_dbc::Message) -> Result<FrameDefinition> {
    let mut signals = Vec::new();

    for dbc_sig in dbc_msg.signals() {
        // Multiplexed signals alias bit positions by construction, so the
        // no-overlap invariant cannot hold for them.
        if !matches!(
            dbc_sig.multiplexer_indicator(),
            can_dbc::MultiplexIndicator::Plain
        ) {
            return Err(GeneratorError::CatalogError(format!(
                "frame '{}' declares multiplexed signal '{}'; multiplexed frames are not supported",
                dbc_msg.message_name(),
                dbc_sig.name()
            )));
        }

        signals.push(convert_signal(dbc_sig));
    }

    // DBC files mark extended 29-bit frames by setting bit 31 of the ID
    // field; trace records carry the bare identifier.
    let id = dbc_msg.message_id().0 & 0x1FFF_FFFF;

    Ok(FrameDefinition {
        id,
        name: dbc_msg.message_name().to_string(),
        size: *dbc_msg.message_size() as usize,
        signals,
    })
}

/// Convert a can-dbc signal to our SignalDefinition
fn convert_signal(dbc_sig: &can_dbc::Signal) -> SignalDefinition {
    let byte_order = match *dbc_sig.byte_order() {
        can_dbc::ByteOrder::LittleEndian => ByteOrder::LittleEndian,
        can_dbc::ByteOrder::BigEndian => ByteOrder::BigEndian,
    };

    let value_type = match *dbc_sig.value_type() {
        can_dbc::ValueType::Signed => ValueType::Signed,
        can_dbc::ValueType::Unsigned => ValueType::Unsigned,
    };

    SignalDefinition {
        name: dbc_sig.name().to_string(),
        start_bit: *dbc_sig.start_bit() as usize,
        length: *dbc_sig.signal_size() as usize,
        byte_order,
        value_type,
        factor: *dbc_sig.factor(),
        offset: *dbc_sig.offset(),
        min: *dbc_sig.min(),
        max: *dbc_sig.max(),
        unit: if dbc_sig.unit().is_empty() {
            None
        } else {
            Some(dbc_sig.unit().to_string())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_dbc(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_simple_dbc() {
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1 ECU2

BO_ 291 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] "rpm" ECU2
 SG_ EngineTemp : 16|8@1+ (1,-40) [-40|215] "C" ECU2

BO_ 512 BatteryStatus: 8 ECU1
 SG_ BatteryVoltage : 0|16@1+ (0.01,0) [0|16] "V" ECU2
"#;

        let temp_file = write_dbc(dbc_content);
        let catalog = load_catalog(temp_file.path()).unwrap();

        let stats = catalog.stats();
        assert_eq!(stats.num_frames, 2);
        assert_eq!(stats.num_signals, 3);

        let frame = catalog.frame(291).unwrap();
        assert_eq!(frame.name, "EngineData");
        assert_eq!(frame.size, 8);

        let sig = &frame.signals[0];
        assert_eq!(sig.name, "EngineSpeed");
        assert_eq!(sig.start_bit, 0);
        assert_eq!(sig.length, 16);
        assert_eq!(sig.factor, 1.0);
        assert_eq!(sig.offset, 0.0);
        assert_eq!(sig.unit, Some("rpm".to_string()));

        let temp = &frame.signals[1];
        assert_eq!(temp.offset, -40.0);
    }

    #[test]
    fn test_overlapping_signals_rejected() {
        // EngineTemp starts inside EngineSpeed's 16-bit range
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 291 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] "rpm" ECU1
 SG_ EngineTemp : 8|8@1+ (1,-40) [-40|215] "C" ECU1
"#;

        let temp_file = write_dbc(dbc_content);
        let result = load_catalog(temp_file.path());
        assert!(matches!(result, Err(GeneratorError::CatalogError(_))));
    }

    #[test]
    fn test_multiplexed_signals_rejected() {
        let dbc_content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU1
 SG_ SignalA m0 : 8|16@1+ (1,0) [0|100] "%" ECU1
 SG_ SignalB m1 : 8|16@1+ (0.1,0) [0|1000] "mV" ECU1
"#;

        let temp_file = write_dbc(dbc_content);
        let result = load_catalog(temp_file.path());
        assert!(matches!(result, Err(GeneratorError::CatalogError(_))));
    }

    #[test]
    fn test_missing_file_is_catalog_error() {
        let result = load_catalog(Path::new("nonexistent.dbc"));
        assert!(matches!(result, Err(GeneratorError::CatalogError(_))));
    }
}
