//! Channel store and resampler
//!
//! Accumulates the named samples produced by the readers/decoder into
//! per-channel sequences, then resamples them onto a single uniform time
//! grid by zero-order hold.

use crate::types::{GeneratorError, RawSample, Result};
use std::collections::HashMap;

/// Comparison slack for grid/sample alignment, well below any real logger
/// interval
const TIME_EPSILON: f64 = 1e-9;

/// One named channel: an ordered sequence of (timestamp, value) pairs
#[derive(Debug, Clone)]
pub struct Channel {
    /// Channel name (unique within the store)
    pub name: String,
    /// Engineering unit, first non-empty one seen for this channel
    pub unit: Option<String>,
    /// (timestamp seconds, value) pairs in arrival order until `resample`
    pub samples: Vec<(f64, f64)>,
}

/// Accumulates samples per channel, in first-seen channel order
#[derive(Debug, Default)]
pub struct ChannelStore {
    channels: Vec<Channel>,
    index: HashMap<String, usize>,
}

/// One channel of the resampled output
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledChannel {
    pub name: String,
    pub unit: Option<String>,
    /// Dense values on the shared grid; `NAN` marks "not yet sampled"
    pub values: Vec<f64>,
}

/// The dense per-channel sample matrix on a shared implicit time axis
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledMatrix {
    /// Sample rate of the grid in Hz
    pub frequency_hz: f64,
    /// Timestamp of the first grid point (earliest sample across channels)
    pub start_time: f64,
    /// Channels in store order, each with one value per grid point
    pub channels: Vec<ResampledChannel>,
}

impl ResampledMatrix {
    /// Number of grid points (identical for every channel)
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChannelStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample to its channel, creating the channel on first sight
    pub fn push(&mut self, sample: RawSample) {
        let idx = match self.index.get(&sample.channel) {
            Some(&idx) => idx,
            None => {
                let idx = self.channels.len();
                self.index.insert(sample.channel.clone(), idx);
                self.channels.push(Channel {
                    name: sample.channel,
                    unit: None,
                    samples: Vec::new(),
                });
                idx
            }
        };

        let channel = &mut self.channels[idx];
        if channel.unit.is_none() {
            channel.unit = sample.unit;
        }
        channel.samples.push((sample.timestamp, sample.value));
    }

    /// Number of channels seen so far
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Total number of samples across all channels
    pub fn num_samples(&self) -> usize {
        self.channels.iter().map(|c| c.samples.len()).sum()
    }

    /// Resample all channels onto a uniform grid at `frequency_hz`
    ///
    /// The grid starts at the earliest sample timestamp across all channels
    /// and extends to the latest, with step `1/frequency_hz`. Each grid
    /// point takes the channel's last sample at or before that point
    /// (zero-order hold); grid points before a channel's first sample are
    /// `NAN`. Channels exhausted before the grid end hold their last value.
    pub fn resample(mut self, frequency_hz: f64) -> Result<ResampledMatrix> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(GeneratorError::InvalidFrequency(frequency_hz));
        }

        // Channels that never received a sample carry no information
        self.channels.retain(|c| !c.samples.is_empty());
        if self.channels.is_empty() {
            return Err(GeneratorError::EmptyChannelSet);
        }

        // Stable sort: ties keep arrival order
        for channel in &mut self.channels {
            channel.samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        }

        let start_time = self
            .channels
            .iter()
            .map(|c| c.samples[0].0)
            .fold(f64::INFINITY, f64::min);
        let end_time = self
            .channels
            .iter()
            .map(|c| c.samples[c.samples.len() - 1].0)
            .fold(f64::NEG_INFINITY, f64::max);

        let step = 1.0 / frequency_hz;
        let num_points = ((end_time - start_time) / step + TIME_EPSILON).floor() as usize + 1;

        log::debug!(
            "Resampling {} channels over {:.3}s at {} Hz ({} points)",
            self.channels.len(),
            end_time - start_time,
            frequency_hz,
            num_points
        );

        let channels = self
            .channels
            .into_iter()
            .map(|channel| {
                let mut values = Vec::with_capacity(num_points);
                let mut held: f64 = f64::NAN;
                let mut next = 0;

                for point in 0..num_points {
                    let grid_time = start_time + point as f64 * step;
                    while next < channel.samples.len()
                        && channel.samples[next].0 <= grid_time + TIME_EPSILON
                    {
                        held = channel.samples[next].1;
                        next += 1;
                    }
                    values.push(held);
                }

                ResampledChannel {
                    name: channel.name,
                    unit: channel.unit,
                    values,
                }
            })
            .collect();

        Ok(ResampledMatrix {
            frequency_hz,
            start_time,
            channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(channel: &str, timestamp: f64, value: f64) -> RawSample {
        RawSample {
            timestamp,
            channel: channel.to_string(),
            value,
            unit: None,
        }
    }

    #[test]
    fn test_zero_order_hold() {
        // Samples at t=0 (v=1) and t=10 (v=2), resampled at 1 Hz:
        // value 1 on [0,10), value 2 at t=10
        let mut store = ChannelStore::new();
        store.push(sample("ch", 0.0, 1.0));
        store.push(sample("ch", 10.0, 2.0));

        let matrix = store.resample(1.0).unwrap();
        assert_eq!(matrix.len(), 11);
        let values = &matrix.channels[0].values;
        for point in 0..10 {
            assert_eq!(values[point], 1.0, "grid point {}", point);
        }
        assert_eq!(values[10], 2.0);
    }

    #[test]
    fn test_grid_is_monotonic_with_constant_step() {
        let mut store = ChannelStore::new();
        store.push(sample("a", 0.0, 1.0));
        store.push(sample("a", 0.987, 2.0));

        let matrix = store.resample(50.0).unwrap();
        let step = 1.0 / matrix.frequency_hz;
        let mut previous = f64::NEG_INFINITY;
        for point in 0..matrix.len() {
            let t = matrix.start_time + point as f64 * step;
            assert!(t > previous);
            previous = t;
        }
        // Grid covers the last sample
        assert!(matrix.start_time + (matrix.len() - 1) as f64 * step <= 0.987 + 1e-6);
        assert!(matrix.start_time + matrix.len() as f64 * step > 0.987);
    }

    #[test]
    fn test_not_yet_sampled_is_nan() {
        // Channel b starts 2s after channel a
        let mut store = ChannelStore::new();
        store.push(sample("a", 0.0, 1.0));
        store.push(sample("b", 2.0, 5.0));
        store.push(sample("a", 3.0, 2.0));

        let matrix = store.resample(1.0).unwrap();
        let b = &matrix.channels[1];
        assert!(b.values[0].is_nan());
        assert!(b.values[1].is_nan());
        assert_eq!(b.values[2], 5.0);
        // Exhausted channels hold their last value to the grid end
        assert_eq!(b.values[3], 5.0);
    }

    #[test]
    fn test_idempotence_on_uniform_input() {
        // Already uniform at 20 Hz: resampling at 20 Hz returns it unchanged
        let mut store = ChannelStore::new();
        let values: Vec<f64> = (0..100).map(|i| (i * 7 % 13) as f64).collect();
        for (i, &v) in values.iter().enumerate() {
            store.push(sample("ch", i as f64 / 20.0, v));
        }

        let matrix = store.resample(20.0).unwrap();
        assert_eq!(matrix.len(), values.len());
        assert_eq!(matrix.channels[0].values, values);
    }

    #[test]
    fn test_out_of_order_samples_are_sorted() {
        let mut store = ChannelStore::new();
        store.push(sample("ch", 2.0, 3.0));
        store.push(sample("ch", 0.0, 1.0));
        store.push(sample("ch", 1.0, 2.0));

        let matrix = store.resample(1.0).unwrap();
        assert_eq!(matrix.channels[0].values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_tie_keeps_arrival_order() {
        // Two samples at the same timestamp: the later arrival wins the hold
        let mut store = ChannelStore::new();
        store.push(sample("ch", 0.0, 1.0));
        store.push(sample("ch", 0.0, 2.0));

        let matrix = store.resample(1.0).unwrap();
        assert_eq!(matrix.channels[0].values, vec![2.0]);
    }

    #[test]
    fn test_empty_channel_set() {
        let store = ChannelStore::new();
        assert!(matches!(
            store.resample(20.0),
            Err(GeneratorError::EmptyChannelSet)
        ));
    }

    #[test]
    fn test_invalid_frequency() {
        let mut store = ChannelStore::new();
        store.push(sample("ch", 0.0, 1.0));
        assert!(matches!(
            store.resample(0.0),
            Err(GeneratorError::InvalidFrequency(_))
        ));

        let mut store = ChannelStore::new();
        store.push(sample("ch", 0.0, 1.0));
        assert!(matches!(
            store.resample(-5.0),
            Err(GeneratorError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn test_channel_order_and_units() {
        let mut store = ChannelStore::new();
        store.push(RawSample {
            timestamp: 0.0,
            channel: "rpm".to_string(),
            value: 1000.0,
            unit: Some("rpm".to_string()),
        });
        store.push(sample("speed", 0.0, 50.0));
        store.push(sample("rpm", 1.0, 1100.0));

        let matrix = store.resample(1.0).unwrap();
        assert_eq!(matrix.channels[0].name, "rpm");
        assert_eq!(matrix.channels[0].unit, Some("rpm".to_string()));
        assert_eq!(matrix.channels[1].name, "speed");
    }
}
