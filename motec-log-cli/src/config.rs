//! Session metadata file loading
//!
//! Metadata can be kept in a small TOML file next to the logs instead of
//! being retyped as command-line flags for every conversion. Flags win over
//! file values when both are given.

use anyhow::{Context, Result};
use motec_log_core::SessionMetadata;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Metadata file contents; every field optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataFile {
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

/// Load a metadata TOML file
pub fn load_metadata_file(path: &Path) -> Result<MetadataFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read metadata file {:?}", path))?;
    let metadata: MetadataFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse metadata file {:?}", path))?;
    Ok(metadata)
}

/// Merge file-loaded metadata under explicitly given flag values
pub fn merge(flags: SessionMetadata, file: MetadataFile) -> SessionMetadata {
    SessionMetadata {
        driver: flags.driver.or(file.driver),
        vehicle_id: flags.vehicle_id.or(file.vehicle_id),
        vehicle_weight: flags.vehicle_weight.or(file.vehicle_weight),
        vehicle_type: flags.vehicle_type.or(file.vehicle_type),
        vehicle_comment: flags.vehicle_comment.or(file.vehicle_comment),
        venue_name: flags.venue_name.or(file.venue_name),
        event_name: flags.event_name.or(file.event_name),
        event_session: flags.event_session.or(file.event_session),
        long_comment: flags.long_comment.or(file.long_comment),
        short_comment: flags.short_comment.or(file.short_comment),
    }
}
