//! Turning audio bytes or peaks into channel data.

use crate::fetcher::BoxFuture;
use tracing::debug;
use waveview_core::{ChannelData, DecodedAudio, Peaks, Result, WaveviewError};

/// Decodes audio bytes at the requested sample rate.
pub trait Decoder: Send + Sync {
    fn decode<'a>(&'a self, bytes: &'a [u8], sample_rate: f64) -> BoxFuture<'a, Result<DecodedAudio>>;
}

/// Interleaved little-endian `f32` PCM already at the requested rate.
#[derive(Debug, Clone, Copy)]
pub struct PcmDecoder {
    pub channels: usize,
}

impl Default for PcmDecoder {
    fn default() -> Self {
        Self { channels: 1 }
    }
}

impl PcmDecoder {
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }

    fn decode_now(&self, bytes: &[u8], sample_rate: f64) -> Result<DecodedAudio> {
        if self.channels == 0 {
            return Err(WaveviewError::Decode("channel count must be positive".into()));
        }
        if sample_rate <= 0.0 {
            return Err(WaveviewError::Decode(format!("invalid sample rate {sample_rate}")));
        }
        let frame_bytes = 4 * self.channels;
        if bytes.is_empty() || bytes.len() % frame_bytes != 0 {
            return Err(WaveviewError::Decode(format!(
                "{} bytes is not a whole number of {}-channel f32 frames",
                bytes.len(),
                self.channels
            )));
        }

        let frames = bytes.len() / frame_bytes;
        let mut channels = vec![Vec::with_capacity(frames); self.channels];
        for (i, sample) in bytes.chunks_exact(4).enumerate() {
            let value = f32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]);
            channels[i % self.channels].push(value);
        }
        let data = ChannelData::new(channels)?;
        let duration = frames as f64 / sample_rate;
        debug!(frames, channels = self.channels, duration, "decoded pcm");
        Ok(DecodedAudio {
            channels: data,
            duration,
            sample_rate,
        })
    }
}

impl Decoder for PcmDecoder {
    fn decode<'a>(&'a self, bytes: &'a [u8], sample_rate: f64) -> BoxFuture<'a, Result<DecodedAudio>> {
        Box::pin(async move { self.decode_now(bytes, sample_rate) })
    }
}

/// Rescale every channel by channel 0's peak, but only when channel 0
/// leaves `[-1, 1]`.
pub fn normalize(channels: ChannelData) -> Result<ChannelData> {
    let Some(first) = channels.channel(0) else {
        return Ok(channels);
    };
    let peak = first.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    if peak <= 1.0 {
        return Ok(channels);
    }
    channels.map_channels(|samples| samples.iter().map(|s| s / peak).collect())
}

/// Wrap pre-computed peaks as decoded audio lasting `duration` seconds.
pub fn create_buffer(peaks: Peaks, duration: f64) -> Result<DecodedAudio> {
    let channels = normalize(peaks.into_channel_data()?)?;
    Ok(DecodedAudio::new(channels, duration))
}
