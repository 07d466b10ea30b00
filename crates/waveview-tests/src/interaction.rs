//! Integration tests for clicks, drags and scrolling on the waveform.

use crate::harness::{ramp, Harness};
use std::time::Duration;
use waveview::{DragToSeek, OptionsPatch, WaveSurferEvent, WaveSurferEventKind};
use waveview_gesture::PointerEvent;

fn drag_harness(drag_to_seek: DragToSeek) -> anyhow::Result<Harness> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.set_options(OptionsPatch {
        drag_to_seek: Some(drag_to_seek),
        ..Default::default()
    })?;
    harness.clear_log();
    Ok(harness)
}

#[test]
fn click_seeks_to_the_clicked_time() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.clear_log();
    harness.wavesurfer.handle_pointer(&PointerEvent::click(100.0, 64.0));

    assert_eq!(harness.wavesurfer.current_time(), 2.0);
    assert_eq!(harness.wavesurfer.renderer().progress(), 0.25);
    let events = harness.events();
    assert!(events.contains(&WaveSurferEvent::Interaction { time: 2.0 }));
    assert!(events.contains(&WaveSurferEvent::Click { x: 0.25, y: 0.5 }));
    Ok(())
}

#[test]
fn double_click_seeks_too() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.handle_pointer(&PointerEvent::double_click(300.0, 10.0));

    assert_eq!(harness.wavesurfer.current_time(), 6.0);
    assert_eq!(harness.count(WaveSurferEventKind::Dblclick), 1);
    Ok(())
}

#[test]
fn non_interactive_waveform_ignores_clicks() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.set_options(OptionsPatch {
        interact: Some(false),
        ..Default::default()
    })?;
    harness.clear_log();
    harness.wavesurfer.handle_pointer(&PointerEvent::click(200.0, 10.0));

    assert_eq!(harness.wavesurfer.current_time(), 0.0);
    assert_eq!(harness.count(WaveSurferEventKind::Click), 0);
    assert_eq!(harness.count(WaveSurferEventKind::Interaction), 0);
    Ok(())
}

#[test]
fn drags_are_ignored_unless_enabled() -> anyhow::Result<()> {
    let harness = drag_harness(DragToSeek::Off)?;
    harness.wavesurfer.handle_pointer(&PointerEvent::down(50.0, 10.0));
    harness.wavesurfer.handle_pointer(&PointerEvent::moved(150.0, 10.0));
    harness.wavesurfer.handle_pointer(&PointerEvent::up(150.0, 10.0));

    assert_eq!(harness.count(WaveSurferEventKind::DragStart), 0);
    assert_eq!(harness.count(WaveSurferEventKind::Drag), 0);
    Ok(())
}

#[test]
fn drag_previews_then_seeks_after_debounce() -> anyhow::Result<()> {
    let harness = drag_harness(DragToSeek::On)?;
    harness.wavesurfer.handle_pointer(&PointerEvent::down(40.0, 10.0));
    harness.wavesurfer.handle_pointer(&PointerEvent::moved(200.0, 10.0));

    assert_eq!(harness.count(WaveSurferEventKind::DragStart), 1);
    assert!(harness.events().contains(&WaveSurferEvent::Drag { x: 0.5 }));
    assert_eq!(harness.wavesurfer.renderer().progress(), 0.5);
    assert_eq!(harness.wavesurfer.current_time(), 0.0);

    harness.host.advance(Duration::from_millis(199));
    assert_eq!(harness.wavesurfer.current_time(), 0.0);
    harness.host.advance(Duration::from_millis(1));
    assert_eq!(harness.wavesurfer.current_time(), 4.0);

    harness.wavesurfer.handle_pointer(&PointerEvent::up(200.0, 10.0));
    assert!(harness.events().contains(&WaveSurferEvent::DragEnd { x: 0.5 }));
    Ok(())
}

#[test]
fn custom_debounce_is_honoured() -> anyhow::Result<()> {
    let harness = drag_harness(DragToSeek::Debounced(50))?;
    harness.wavesurfer.handle_pointer(&PointerEvent::down(40.0, 10.0));
    harness.wavesurfer.handle_pointer(&PointerEvent::moved(100.0, 10.0));
    harness.host.advance(Duration::from_millis(50));

    assert_eq!(harness.wavesurfer.current_time(), 2.0);
    Ok(())
}

#[test]
fn drag_while_playing_seeks_on_next_turn() -> anyhow::Result<()> {
    let harness = drag_harness(DragToSeek::On)?;
    harness.wavesurfer.play()?;
    harness.wavesurfer.handle_pointer(&PointerEvent::down(40.0, 10.0));
    harness.wavesurfer.handle_pointer(&PointerEvent::moved(300.0, 10.0));
    harness.host.flush();

    assert_eq!(harness.wavesurfer.current_time(), 6.0);
    assert!(harness.wavesurfer.is_playing());
    Ok(())
}

#[test]
fn click_right_after_a_drag_is_swallowed() -> anyhow::Result<()> {
    let harness = drag_harness(DragToSeek::On)?;
    harness.wavesurfer.handle_pointer(&PointerEvent::down(40.0, 10.0));
    harness.wavesurfer.handle_pointer(&PointerEvent::moved(200.0, 10.0));
    harness.wavesurfer.handle_pointer(&PointerEvent::up(200.0, 10.0));

    assert!(harness.wavesurfer.handle_pointer(&PointerEvent::click(200.0, 10.0)));
    assert_eq!(harness.count(WaveSurferEventKind::Click), 0);

    let later = PointerEvent::click(100.0, 10.0).at(Duration::from_millis(50));
    assert!(!harness.wavesurfer.handle_pointer(&later));
    assert_eq!(harness.count(WaveSurferEventKind::Click), 1);
    Ok(())
}

#[test]
fn scrolling_emits_visible_time_range() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(3000)], 20.0)?;
    harness.wavesurfer.zoom(50.0)?;
    harness.clear_log();

    harness.wavesurfer.handle_scroll(250.0);
    let scroll = harness
        .events()
        .into_iter()
        .find(|event| matches!(event, WaveSurferEvent::Scroll { .. }));
    match scroll {
        Some(WaveSurferEvent::Scroll { start, end, left, right }) => {
            assert_eq!(left, 250.0);
            assert_eq!(right, 650.0);
            assert!((start - 5.0).abs() < 1e-9);
            assert!((end - 13.0).abs() < 1e-9);
        }
        other => panic!("expected a scroll event, got {other:?}"),
    }
    Ok(())
}
