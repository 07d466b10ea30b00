//! Paint layer: the only code that issues canvas calls for a waveform.

use crate::bars::{compute_bar_segments, BarLayout, BarOptions, BarSegment};
use crate::canvas::{trace_rounded_rect, Canvas2d};
use crate::color::{ColorSpec, FillStyle};
use crate::path::build_waveform_path;
use crate::peaks::downsample;
use waveview_core::{clamp_ratio, ChannelData, Result};

/// How to paint one canvas of waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformRenderOptions {
    /// Canvas size in device px.
    pub width: f64,
    pub height: f64,
    pub v_scale: f64,
    pub wave_color: ColorSpec,
    pub progress_color: Option<ColorSpec>,
    /// Clamped to `[0, 1]` when painted.
    pub progress: Option<f64>,
    pub bars: BarOptions,
    pub pixel_ratio: f64,
}

impl WaveformRenderOptions {
    pub fn new(width: f64, height: f64, wave_color: ColorSpec) -> Self {
        Self {
            width,
            height,
            v_scale: 1.0,
            wave_color,
            progress_color: None,
            progress: None,
            bars: BarOptions::default(),
            pixel_ratio: 1.0,
        }
    }

    pub fn should_render_bars(&self) -> bool {
        self.bars.enabled()
    }

    fn progress_fill(&self) -> Result<Option<(FillStyle, f64)>> {
        let progress = self.progress.map(clamp_ratio).filter(|p| *p > 0.0);
        match (&self.progress_color, progress) {
            (Some(color), Some(progress)) => Ok(Some((color.resolve(self.height)?, progress))),
            _ => Ok(None),
        }
    }
}

/// Fill the silhouette with `wave`, then repaint the part left of
/// `progress * width` with the progress style under a clip.
pub fn render_line_waveform(
    ctx: &mut dyn Canvas2d,
    channels: &[&[f32]],
    width: f64,
    height: f64,
    v_scale: f64,
    wave: &FillStyle,
    progress: Option<(&FillStyle, f64)>,
) {
    let path = build_waveform_path(channels, width, height, v_scale);
    if path.is_empty() {
        return;
    }
    ctx.begin_path();
    path.trace(ctx);
    ctx.set_fill_style(wave);
    ctx.fill();

    if let Some((style, ratio)) = progress.filter(|(_, p)| *p > 0.0) {
        ctx.save();
        ctx.begin_path();
        ctx.rect(0.0, 0.0, ratio * width, height);
        ctx.clip();
        ctx.begin_path();
        path.trace(ctx);
        ctx.set_fill_style(style);
        ctx.fill();
        ctx.restore();
    }
}

fn trace_bars<'a>(ctx: &mut dyn Canvas2d, bars: impl Iterator<Item = &'a BarSegment>, radius: f64) -> bool {
    let mut any = false;
    for bar in bars {
        if !any {
            ctx.begin_path();
            any = true;
        }
        trace_rounded_rect(ctx, bar.x, bar.y, bar.width, bar.height, radius);
    }
    any
}

/// Fill the bars; bars starting left of `progress * total_width` take the
/// progress style. At most one fill per style.
pub fn render_bar_waveform(
    ctx: &mut dyn Canvas2d,
    segments: &[BarSegment],
    radius: Option<f64>,
    wave: &FillStyle,
    progress: Option<(&FillStyle, f64)>,
    total_width: f64,
) {
    if segments.is_empty() {
        return;
    }
    let radius = radius.unwrap_or(0.0);
    let split = progress.map_or(f64::NEG_INFINITY, |(_, p)| p * total_width);

    if trace_bars(ctx, segments.iter().filter(|b| b.x >= split), radius) {
        ctx.set_fill_style(wave);
        ctx.fill();
    }
    if let Some((style, _)) = progress {
        if trace_bars(ctx, segments.iter().filter(|b| b.x < split), radius) {
            ctx.set_fill_style(style);
            ctx.fill();
        }
    }
}

/// Clear the canvas and paint `channels` as bars or as a line silhouette.
pub fn render_waveform_with_channel_data(
    ctx: &mut dyn Canvas2d,
    channels: &[&[f32]],
    options: &WaveformRenderOptions,
) -> Result<()> {
    let wave = options.wave_color.resolve(options.height)?;
    let progress = options.progress_fill()?;
    let progress = progress.as_ref().map(|(style, p)| (style, *p));

    ctx.clear_rect(0.0, 0.0, options.width, options.height);

    if options.should_render_bars() {
        let (bar_width, bar_gap) = options.bars.device_metrics(options.pixel_ratio);
        let segments = compute_bar_segments(
            channels,
            &BarLayout {
                width: options.width,
                height: options.height,
                v_scale: options.v_scale,
                bar_width,
                bar_gap,
                align: options.bars.align,
            },
        );
        let radius = options.bars.radius.map(|r| r * options.pixel_ratio);
        render_bar_waveform(ctx, &segments, radius, &wave, progress, options.width);
    } else {
        let buckets = options.width.max(1.0).ceil() as usize;
        let reduced: Vec<Vec<f32>> = channels.iter().map(|c| downsample(c, buckets)).collect();
        let reduced: Vec<&[f32]> = reduced.iter().map(Vec::as_slice).collect();
        render_line_waveform(ctx, &reduced, options.width, options.height, options.v_scale, &wave, progress);
    }
    Ok(())
}

/// Paint decoded audio onto a single canvas, progress included. For
/// consumers that draw their own small overviews.
pub fn render_to_canvas(ctx: &mut dyn Canvas2d, audio: &ChannelData, options: &WaveformRenderOptions) -> Result<()> {
    render_waveform_with_channel_data(ctx, &audio.as_slices(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCommand, RecordingCanvas};

    fn solid(c: &str) -> FillStyle {
        FillStyle::Color(c.into())
    }

    #[test]
    fn test_line_without_progress_fills_once() {
        let mut canvas = RecordingCanvas::new(100.0, 50.0);
        render_line_waveform(&mut canvas, &[&[0.5, 1.0, 0.2]], 100.0, 50.0, 1.0, &solid("#999"), None);
        assert_eq!(canvas.fill_count(), 1);
        assert_eq!(canvas.count(|c| matches!(c, DrawCommand::Clip)), 0);
    }

    #[test]
    fn test_line_progress_is_clipped_and_restored() {
        let mut canvas = RecordingCanvas::new(100.0, 50.0);
        let progress = solid("#555");
        render_line_waveform(
            &mut canvas,
            &[&[0.5, 1.0]],
            100.0,
            50.0,
            1.0,
            &solid("#999"),
            Some((&progress, 0.25)),
        );
        assert_eq!(canvas.fill_count(), 2);
        assert!(canvas.is_balanced());
        assert!(canvas.commands().contains(&DrawCommand::Rect {
            x: 0.0,
            y: 0.0,
            width: 25.0,
            height: 50.0
        }));
        assert_eq!(canvas.commands().last(), Some(&DrawCommand::Restore));
    }

    #[test]
    fn test_zero_progress_skips_second_pass() {
        let mut canvas = RecordingCanvas::new(100.0, 50.0);
        let progress = solid("#555");
        render_line_waveform(&mut canvas, &[&[0.5]], 100.0, 50.0, 1.0, &solid("#999"), Some((&progress, 0.0)));
        assert_eq!(canvas.fill_count(), 1);
    }

    #[test]
    fn test_empty_bars_draw_nothing() {
        let mut canvas = RecordingCanvas::new(100.0, 50.0);
        render_bar_waveform(&mut canvas, &[], Some(2.0), &solid("#999"), None, 100.0);
        assert!(canvas.commands().is_empty());
    }

    #[test]
    fn test_bars_split_by_progress() {
        let bars: Vec<BarSegment> = (0..4)
            .map(|i| BarSegment {
                x: i as f64 * 10.0,
                y: 0.0,
                width: 5.0,
                height: 10.0,
            })
            .collect();
        let mut canvas = RecordingCanvas::new(40.0, 10.0);
        let progress = solid("#555");
        render_bar_waveform(&mut canvas, &bars, None, &solid("#999"), Some((&progress, 0.5)), 40.0);
        assert_eq!(canvas.fill_count(), 2);
        let rects = canvas.count(|c| matches!(c, DrawCommand::Rect { .. }));
        assert_eq!(rects, 4);
        let styles: Vec<_> = canvas
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::SetFillStyle(FillStyle::Color(c)) => Some(c.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(styles, vec!["#999", "#555"]);
    }

    #[test]
    fn test_dispatch_clears_then_paints_bars() {
        let mut canvas = RecordingCanvas::new(100.0, 50.0);
        let mut options = WaveformRenderOptions::new(100.0, 50.0, ColorSpec::gradient(["#000", "#fff"]));
        options.bars.width = Some(2.0);
        render_waveform_with_channel_data(&mut canvas, &[&[0.5; 200]], &options).unwrap();
        assert!(matches!(canvas.commands()[0], DrawCommand::ClearRect { .. }));
        assert!(matches!(
            canvas.commands().iter().find(|c| matches!(c, DrawCommand::SetFillStyle(_))),
            Some(DrawCommand::SetFillStyle(FillStyle::LinearGradient(_)))
        ));
        assert_eq!(canvas.fill_count(), 1);
    }

    #[test]
    fn test_render_to_canvas_rejects_empty_gradient() {
        let mut canvas = RecordingCanvas::new(10.0, 10.0);
        let audio = ChannelData::mono(vec![0.1; 10]).unwrap();
        let options = WaveformRenderOptions::new(10.0, 10.0, ColorSpec::Gradient(Vec::new()));
        assert!(render_to_canvas(&mut canvas, &audio, &options).is_err());
    }
}
