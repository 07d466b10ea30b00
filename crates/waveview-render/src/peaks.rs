//! Peak reduction of channel data.
//!
//! Reduces sample arrays to one value per pixel column (for drawing) or per
//! export slot (for caching peaks alongside the audio).

use serde::{Deserialize, Serialize};
use waveview_core::{ChannelData, Peaks};

/// Amplitude range of a run of samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f32,
    pub max: f32,
}

impl MinMax {
    /// Range of `samples`; all zero when empty.
    pub fn of(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &s in samples {
            if s < min {
                min = s;
            }
            if s > max {
                max = s;
            }
        }
        Self { min, max }
    }

    /// The extreme with the larger magnitude, sign kept.
    pub fn peak(&self) -> f32 {
        if self.min.abs() > self.max.abs() {
            self.min
        } else {
            self.max
        }
    }
}

/// Reduce `samples` to `buckets` values, each the signed max-magnitude of
/// its window. Input already at or below `buckets` is returned as is.
pub fn downsample(samples: &[f32], buckets: usize) -> Vec<f32> {
    if buckets == 0 {
        return Vec::new();
    }
    if samples.len() <= buckets {
        return samples.to_vec();
    }
    let len = samples.len();
    (0..buckets)
        .map(|b| {
            let start = b * len / buckets;
            let end = ((b + 1) * len / buckets).max(start + 1);
            MinMax::of(&samples[start..end]).peak()
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportPeaksOptions {
    /// Most channels to export.
    pub channels: usize,
    /// Values per channel.
    pub max_length: usize,
    /// Values are rounded to `1 / precision`.
    pub precision: u32,
}

impl Default for ExportPeaksOptions {
    fn default() -> Self {
        Self {
            channels: 2,
            max_length: 8000,
            precision: 10_000,
        }
    }
}

/// Export `max_length` peaks per channel. Slot `i` covers samples
/// `floor(i * n / max_length) .. ceil((i + 1) * n / max_length)`.
pub fn export_peaks(data: &ChannelData, options: &ExportPeaksOptions) -> Peaks {
    let channels = options.channels.min(data.num_channels());
    let precision = f64::from(options.precision.max(1));
    let mut peaks = Vec::with_capacity(channels);
    for index in 0..channels {
        let Some(samples) = data.channel(index) else {
            break;
        };
        let slot = samples.len() as f64 / options.max_length.max(1) as f64;
        let values = (0..options.max_length)
            .map(|i| {
                let start = ((i as f64 * slot).floor() as usize).min(samples.len());
                let end = (((i + 1) as f64 * slot).ceil() as usize).clamp(start, samples.len());
                let peak = f64::from(MinMax::of(&samples[start..end]).peak());
                ((peak * precision).round() / precision) as f32
            })
            .collect();
        peaks.push(values);
    }
    Peaks(peaks)
}
