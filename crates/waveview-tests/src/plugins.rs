//! Integration tests for the plugin contract.

use crate::harness::{ramp, Harness};
use parking_lot::Mutex;
use std::sync::Arc;
use waveview::{Plugin, PluginBase, PluginEvent, PluginEventKind, WaveSurfer, WaveSurferEventKind};
use waveview_core::Result;
use waveview_render::{render_to_canvas, ColorSpec, RecordingCanvas, WaveformRenderOptions};

/// Paints a small overview of the waveform whenever the main one redraws.
#[derive(Default)]
struct Overview {
    base: PluginBase,
    canvas: Arc<Mutex<Option<RecordingCanvas>>>,
}

impl Plugin for Overview {
    fn name(&self) -> &str {
        "overview"
    }

    fn base(&self) -> &PluginBase {
        &self.base
    }

    fn on_init(&self, wavesurfer: &WaveSurfer) -> Result<()> {
        let weak = wavesurfer.downgrade();
        let canvas = Arc::clone(&self.canvas);
        let events = self.base.events().clone();
        self.base.hold(wavesurfer.on(WaveSurferEventKind::RedrawComplete, move |_| {
            let Some(wavesurfer) = weak.upgrade() else {
                return;
            };
            let Some(decoded) = wavesurfer.decoded_data() else {
                return;
            };
            let mut overview = RecordingCanvas::new(100.0, 20.0);
            let mut options = WaveformRenderOptions::new(100.0, 20.0, ColorSpec::solid("#ccc"));
            options.progress_color = Some(ColorSpec::solid("#333"));
            options.progress = Some(wavesurfer.renderer().progress());
            if render_to_canvas(&mut overview, &decoded.channels, &options).is_ok() {
                *canvas.lock() = Some(overview);
                events.emit(PluginEvent::Custom {
                    name: "painted".into(),
                    payload: serde_json::Value::Null,
                });
            }
        }));
        Ok(())
    }
}

#[test]
fn plugin_follows_redraws() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    let overview = harness.wavesurfer.register_plugin(Arc::new(Overview::default()))?;
    let painted = Arc::new(Mutex::new(0));
    let p = Arc::clone(&painted);
    let _sub = overview
        .base()
        .events()
        .on(PluginEventKind::Custom, move |_| *p.lock() += 1);

    assert!(overview.canvas.lock().is_none());
    harness.wavesurfer.zoom(200.0)?;
    assert_eq!(*painted.lock(), 1);
    let commands = overview.canvas.lock().as_ref().map_or(0, |c| c.commands().len());
    assert!(commands > 0);
    Ok(())
}

#[test]
fn plugin_destroy_deregisters_it() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    let overview = harness.wavesurfer.register_plugin(Arc::new(Overview::default()))?;
    assert_eq!(harness.wavesurfer.active_plugins().len(), 1);

    overview.destroy();
    assert!(harness.wavesurfer.active_plugins().is_empty());
    assert!(overview.base().wavesurfer().is_none());

    harness.wavesurfer.zoom(200.0)?;
    assert!(overview.canvas.lock().is_none());
    Ok(())
}

#[test]
fn instance_destroy_destroys_plugins() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    let overview = harness.wavesurfer.register_plugin(Arc::new(Overview::default()))?;
    let destroyed = Arc::new(Mutex::new(false));
    let d = Arc::clone(&destroyed);
    let _sub = overview
        .base()
        .events()
        .on(PluginEventKind::Destroy, move |_| *d.lock() = true);

    harness.wavesurfer.destroy();
    assert!(*destroyed.lock());
    assert!(harness.wavesurfer.active_plugins().is_empty());
    Ok(())
}
