//! Decoded audio shared between the decoder, the renderer and the orchestrator.

use crate::error::{Result, WaveviewError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-channel amplitude samples, roughly in `[-1, 1]`.
///
/// All channels have the same, non-zero length. Read-only once built;
/// clones share the sample storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelData {
    channels: Arc<[Vec<f32>]>,
}

impl ChannelData {
    /// Build channel data, rejecting empty input and mismatched lengths.
    pub fn new(channels: Vec<Vec<f32>>) -> Result<Self> {
        let first_len = match channels.first() {
            Some(first) => first.len(),
            None => return Err(WaveviewError::InvalidAudio("no channels".into())),
        };
        if first_len == 0 {
            return Err(WaveviewError::InvalidAudio("channels are empty".into()));
        }
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != first_len)
        {
            return Err(WaveviewError::InvalidAudio(format!(
                "channel {index} has {} samples, expected {first_len}",
                channel.len()
            )));
        }
        Ok(Self {
            channels: channels.into(),
        })
    }

    /// Single-channel convenience constructor.
    pub fn mono(samples: Vec<f32>) -> Result<Self> {
        Self::new(vec![samples])
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    #[inline]
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Always false: construction rejects empty channels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Samples of channel `index`, if present.
    #[inline]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channels as slices.
    pub fn as_slices(&self) -> Vec<&[f32]> {
        self.channels.iter().map(Vec::as_slice).collect()
    }

    /// Largest absolute sample across all channels.
    pub fn max_abs(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }

    /// Apply `f` to a copy of every channel.
    pub fn map_channels(&self, f: impl Fn(&[f32]) -> Vec<f32>) -> Result<Self> {
        Self::new(self.channels.iter().map(|c| f(c)).collect())
    }
}

/// Result of decoding: channel data plus its playback duration.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub channels: ChannelData,
    /// Duration in seconds.
    pub duration: f64,
    /// Samples per second of `channels`.
    pub sample_rate: f64,
}

impl DecodedAudio {
    pub fn new(channels: ChannelData, duration: f64) -> Self {
        let sample_rate = if duration > 0.0 {
            channels.len() as f64 / duration
        } else {
            0.0
        };
        Self {
            channels,
            duration,
            sample_rate,
        }
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.num_channels()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Peaks as exported to or accepted from hosts: one list per channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Peaks(pub Vec<Vec<f32>>);

impl Peaks {
    pub fn into_channel_data(self) -> Result<ChannelData> {
        ChannelData::new(self.0)
    }
}
