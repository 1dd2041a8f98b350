//! MCAP session reader
//!
//! Replays channel/timestamp/value triples from an MCAP container. Message
//! payloads are expected to be JSON-encoded; numeric leaves are flattened
//! into channels named `<topic>.<field>` (nested keys dot-joined). Channels
//! with other encodings are skipped with a one-time warning - MCAP files
//! routinely carry topics (images, diagnostics) that have no place in a
//! telemetry export.

use crate::formats::LogReader;
use crate::types::{GeneratorError, RawRecord, RawSample, Result};
use std::collections::HashSet;
use std::path::Path;

/// Nanoseconds per second, the unit of MCAP `log_time`
const NS_PER_SEC: f64 = 1_000_000_000.0;

/// Reader for MCAP containers with JSON-encoded messages
///
/// The underlying stream borrows the file buffer, so the container is
/// drained eagerly at `parse` time; the pipeline consumes stages whole
/// anyway.
pub struct McapReader {
    samples: std::vec::IntoIter<RawSample>,
}

impl LogReader for McapReader {
    fn parse(path: &Path) -> Result<Self> {
        log::info!("Opening MCAP container: {:?}", path);
        let data = std::fs::read(path)?;

        let stream = mcap::MessageStream::new(&data).map_err(|e| {
            GeneratorError::MalformedRecord {
                line: 0,
                reason: format!("not a readable MCAP container: {}", e),
            }
        })?;

        let mut samples = Vec::new();
        let mut skipped_topics: HashSet<String> = HashSet::new();

        for (index, message) in stream.enumerate() {
            let message = message.map_err(|e| GeneratorError::MalformedRecord {
                line: index + 1,
                reason: format!("failed to read message: {}", e),
            })?;

            let channel = &message.channel;
            if channel.message_encoding != "json" {
                if skipped_topics.insert(channel.topic.clone()) {
                    log::warn!(
                        "Skipping topic '{}' with unsupported encoding '{}'",
                        channel.topic,
                        channel.message_encoding
                    );
                }
                continue;
            }

            let payload: serde_json::Value = serde_json::from_slice(&message.data).map_err(
                |e| GeneratorError::MalformedRecord {
                    line: index + 1,
                    reason: format!("invalid JSON payload on topic '{}': {}", channel.topic, e),
                },
            )?;

            let timestamp = message.log_time as f64 / NS_PER_SEC;
            let prefix = channel.topic.trim_start_matches('/').replace('/', ".");
            let unit = channel.metadata.get("unit").cloned();

            flatten_value(&prefix, &payload, timestamp, unit.as_deref(), &mut samples);
        }

        Ok(Self {
            samples: samples.into_iter(),
        })
    }
}

impl Iterator for McapReader {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.samples.next().map(|s| Ok(RawRecord::Sample(s)))
    }
}

/// Flatten the numeric leaves of a JSON value into samples
///
/// Objects recurse with dot-joined keys; booleans map to 0/1; strings,
/// nulls and arrays carry no channel data and are skipped.
fn flatten_value(
    prefix: &str,
    value: &serde_json::Value,
    timestamp: f64,
    unit: Option<&str>,
    out: &mut Vec<RawSample>,
) {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_f64() {
                out.push(RawSample {
                    timestamp,
                    channel: prefix.to_string(),
                    value: v,
                    unit: unit.map(str::to_string),
                });
            }
        }
        serde_json::Value::Bool(b) => {
            out.push(RawSample {
                timestamp,
                channel: prefix.to_string(),
                value: if *b { 1.0 } else { 0.0 },
                unit: unit.map(str::to_string),
            });
        }
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                let nested_prefix = format!("{}.{}", prefix, key);
                flatten_value(&nested_prefix, nested, timestamp, unit, out);
            }
        }
        _ => {}
    }
}
