//! Pure waveform geometry: channel polylines and closed silhouettes.

use crate::canvas::Canvas2d;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
}

impl PathCommand {
    pub fn point(&self) -> (f64, f64) {
        match *self {
            PathCommand::MoveTo { x, y } | PathCommand::LineTo { x, y } => (x, y),
        }
    }
}

/// x of sample `index` when `len` samples span `width` px.
#[inline]
fn sample_x(index: usize, len: usize, width: f64) -> f64 {
    if len > 1 {
        index as f64 * width / (len - 1) as f64
    } else {
        0.0
    }
}

fn channel_points<'a>(
    samples: &'a [f32],
    width: f64,
    height: f64,
    v_scale: f64,
    start_from_bottom: bool,
    magnitude: bool,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    let len = samples.len();
    samples.iter().enumerate().map(move |(i, &sample)| {
        let sample = f64::from(if magnitude { sample.abs() } else { sample });
        let y = if start_from_bottom {
            height - sample * v_scale * height
        } else {
            height / 2.0 - sample * v_scale * height / 2.0
        };
        (sample_x(i, len, width), y)
    })
}

/// One command per sample: a move to the first point, lines to the rest.
///
/// Mirror mode centres the baseline at `height / 2`; bottom-anchored mode
/// grows upward from `height`. Callers aggregate samples down to pixel
/// resolution beforehand.
pub fn generate_channel_path(
    samples: &[f32],
    width: f64,
    height: f64,
    v_scale: f64,
    start_from_bottom: bool,
) -> Vec<PathCommand> {
    channel_points(samples, width, height, v_scale, start_from_bottom, false)
        .enumerate()
        .map(|(i, (x, y))| {
            if i == 0 {
                PathCommand::MoveTo { x, y }
            } else {
                PathCommand::LineTo { x, y }
            }
        })
        .collect()
}

/// A closed filled outline of one or two channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformPath {
    pub commands: Vec<PathCommand>,
}

impl WaveformPath {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Add the outline to the current path of `ctx`.
    pub fn trace(&self, ctx: &mut dyn Canvas2d) {
        if self.is_empty() {
            return;
        }
        for command in &self.commands {
            match *command {
                PathCommand::MoveTo { x, y } => ctx.move_to(x, y),
                PathCommand::LineTo { x, y } => ctx.line_to(x, y),
            }
        }
        ctx.close_path();
    }

    /// SVG path data, terminated by a single `Z`.
    pub fn to_svg(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut data = String::with_capacity(self.commands.len() * 16);
        for command in &self.commands {
            let (letter, (x, y)) = match command {
                PathCommand::MoveTo { .. } => ('M', command.point()),
                PathCommand::LineTo { .. } => ('L', command.point()),
            };
            let _ = write!(data, "{letter}{} {} ", round2(x), round2(y));
        }
        data.push('Z');
        data
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Closed silhouette of the channel data.
///
/// Mono: the top outline left to right, then its mirror image right to
/// left. Two or more channels: channel 0 grows up from the centre line and
/// channel 1 hangs down from it, so the channels never overlap. Channels
/// past the second are not drawn here; split-channel rendering gives each
/// its own track. Amplitudes are drawn by magnitude.
pub fn build_waveform_path(channels: &[&[f32]], width: f64, height: f64, v_scale: f64) -> WaveformPath {
    if channels.is_empty() || channels.iter().any(|c| c.is_empty()) {
        return WaveformPath::default();
    }

    let half = height / 2.0;
    let top: Vec<(f64, f64)> = if channels.len() == 1 {
        channel_points(channels[0], width, height, v_scale, false, true).collect()
    } else {
        channel_points(channels[0], width, half, v_scale, true, true).collect()
    };
    let bottom_source = channels.get(1).copied().unwrap_or(channels[0]);
    let bottom: Vec<(f64, f64)> = if channels.len() == 1 {
        top.iter().map(|&(x, y)| (x, height - y)).collect()
    } else {
        channel_points(bottom_source, width, half, v_scale, true, true)
            .map(|(x, y)| (x, height - y))
            .collect()
    };

    let mut commands = Vec::with_capacity(top.len() + bottom.len());
    for (i, &(x, y)) in top.iter().enumerate() {
        commands.push(if i == 0 {
            PathCommand::MoveTo { x, y }
        } else {
            PathCommand::LineTo { x, y }
        });
    }
    commands.extend(bottom.iter().rev().map(|&(x, y)| PathCommand::LineTo { x, y }));
    WaveformPath { commands }
}

/// SVG path data of [`build_waveform_path`]; empty when there is nothing
/// to draw.
pub fn build_waveform_path_data(channels: &[&[f32]], width: f64, height: f64, v_scale: f64) -> String {
    build_waveform_path(channels, width, height, v_scale).to_svg()
}
