//! 2D canvas abstraction and a display-list recorder.

use crate::color::FillStyle;
use serde::{Deserialize, Serialize};
use waveview_core::Result;

/// The subset of the 2D canvas API the compositor draws with.
pub trait Canvas2d {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn set_fill_style(&mut self, style: &FillStyle);
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64);
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn clip(&mut self);
    fn save(&mut self);
    fn restore(&mut self);
}

/// One recorded canvas call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    SetFillStyle(FillStyle),
    ClearRect { x: f64, y: f64, width: f64, height: f64 },
    FillRect { x: f64, y: f64, width: f64, height: f64 },
    BeginPath,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    QuadraticCurveTo { cpx: f64, cpy: f64, x: f64, y: f64 },
    Rect { x: f64, y: f64, width: f64, height: f64 },
    ClosePath,
    Fill,
    Clip,
    Save,
    Restore,
}

/// Canvas that records every call instead of rasterizing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingCanvas {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn count(&self, predicate: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    /// Number of `fill` calls.
    pub fn fill_count(&self) -> usize {
        self.count(|c| matches!(c, DrawCommand::Fill))
    }

    /// Whether saves and restores pair up.
    pub fn is_balanced(&self) -> bool {
        let mut depth = 0i32;
        for command in &self.commands {
            match command {
                DrawCommand::Save => depth += 1,
                DrawCommand::Restore => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }
        depth == 0
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl Canvas2d for RecordingCanvas {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn set_fill_style(&mut self, style: &FillStyle) {
        self.push(DrawCommand::SetFillStyle(style.clone()));
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::ClearRect { x, y, width, height });
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::FillRect { x, y, width, height });
    }

    fn begin_path(&mut self) {
        self.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::LineTo { x, y });
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.push(DrawCommand::QuadraticCurveTo { cpx, cpy, x, y });
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::Rect { x, y, width, height });
    }

    fn close_path(&mut self) {
        self.push(DrawCommand::ClosePath);
    }

    fn fill(&mut self) {
        self.push(DrawCommand::Fill);
    }

    fn clip(&mut self) {
        self.push(DrawCommand::Clip);
    }

    fn save(&mut self) {
        self.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.push(DrawCommand::Restore);
    }
}

/// Encoded image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A canvas element owned by a render surface.
pub trait CanvasTile: Send {
    /// Backing-store size in device pixels.
    fn size(&self) -> (u32, u32);

    /// Run `paint` against the tile's 2D context.
    fn paint(&mut self, paint: &mut dyn FnMut(&mut dyn Canvas2d));

    fn to_data_url(&self, mime_type: &str, quality: f64) -> Result<String>;

    fn to_blob(&self, mime_type: &str, quality: f64) -> Result<ImageBlob>;
}

/// Trace a rectangle with rounded corners as a closed subpath. The radius is
/// clamped to half the smaller side; a zero radius traces a plain rect.
pub fn trace_rounded_rect(ctx: &mut dyn Canvas2d, x: f64, y: f64, width: f64, height: f64, radius: f64) {
    let r = radius.min(width.abs() / 2.0).min(height.abs() / 2.0).max(0.0);
    if r == 0.0 {
        ctx.rect(x, y, width, height);
        return;
    }
    ctx.move_to(x + r, y);
    ctx.line_to(x + width - r, y);
    ctx.quadratic_curve_to(x + width, y, x + width, y + r);
    ctx.line_to(x + width, y + height - r);
    ctx.quadratic_curve_to(x + width, y + height, x + width - r, y + height);
    ctx.line_to(x + r, y + height);
    ctx.quadratic_curve_to(x, y + height, x, y + height - r);
    ctx.line_to(x, y + r);
    ctx.quadratic_curve_to(x, y, x + r, y);
    ctx.close_path();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let mut canvas = RecordingCanvas::new(10.0, 10.0);
        canvas.save();
        canvas.begin_path();
        canvas.rect(0.0, 0.0, 5.0, 5.0);
        canvas.fill();
        canvas.restore();
        assert_eq!(canvas.commands().len(), 5);
        assert_eq!(canvas.fill_count(), 1);
        assert!(canvas.is_balanced());
    }

    #[test]
    fn test_unbalanced_restore() {
        let mut canvas = RecordingCanvas::new(1.0, 1.0);
        canvas.restore();
        canvas.save();
        assert!(!canvas.is_balanced());
    }

    #[test]
    fn test_rounded_rect_clamps_radius() {
        let mut canvas = RecordingCanvas::new(10.0, 10.0);
        trace_rounded_rect(&mut canvas, 0.0, 0.0, 4.0, 20.0, 10.0);
        assert_eq!(canvas.commands()[0], DrawCommand::MoveTo { x: 2.0, y: 0.0 });
        assert_eq!(canvas.commands().last(), Some(&DrawCommand::ClosePath));
        assert_eq!(canvas.count(|c| matches!(c, DrawCommand::QuadraticCurveTo { .. })), 4);
    }

    #[test]
    fn test_zero_radius_is_plain_rect() {
        let mut canvas = RecordingCanvas::new(10.0, 10.0);
        trace_rounded_rect(&mut canvas, 1.0, 2.0, 3.0, 4.0, 0.0);
        assert_eq!(
            canvas.commands(),
            &[DrawCommand::Rect {
                x: 1.0,
                y: 2.0,
                width: 3.0,
                height: 4.0
            }]
        );
    }
}
