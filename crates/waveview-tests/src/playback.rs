//! Integration tests for playback sync between media, timer and renderer.

use crate::harness::{ramp, Harness, CONTAINER_WIDTH};
use std::time::Duration;
use waveview::{OptionsPatch, WaveSurferEvent, WaveSurferEventKind};
use waveview_media::MediaElement;

#[test]
fn progress_follows_playback() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.play()?;
    harness.run_for(2000);

    let time = harness.wavesurfer.current_time();
    assert!((time - 2.0).abs() < 0.05, "time {time}");
    let progress = harness.wavesurfer.renderer().progress();
    assert!((progress - time / 8.0).abs() < 0.01, "progress {progress}");
    assert!(harness.count(WaveSurferEventKind::AudioProcess) > 100);
    Ok(())
}

#[test]
fn pause_stops_the_timer() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.play()?;
    harness.run_for(320);
    harness.wavesurfer.pause();
    assert_eq!(harness.count(WaveSurferEventKind::Pause), 1);

    harness.clear_log();
    harness.host.advance(Duration::from_secs(1));
    assert_eq!(harness.count(WaveSurferEventKind::AudioProcess), 0);
    Ok(())
}

#[test]
fn play_range_stops_at_end() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.play_range(Some(2.0), Some(3.0))?;
    harness.run_for(2000);

    assert!(!harness.wavesurfer.is_playing());
    let time = harness.wavesurfer.current_time();
    assert!((3.0..3.05).contains(&time), "time {time}");
    Ok(())
}

#[test]
fn seeking_clears_the_play_range() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.play_range(None, Some(0.5))?;
    harness.wavesurfer.set_time(4.0);
    harness.run_for(1000);

    assert!(harness.wavesurfer.is_playing());
    assert!(harness.wavesurfer.current_time() > 4.9);
    Ok(())
}

#[test]
fn finish_at_end_of_media() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(100)], 1.0)?;
    harness.wavesurfer.play()?;
    harness.run_for(1500);

    assert_eq!(harness.count(WaveSurferEventKind::Finish), 1);
    assert!(!harness.wavesurfer.is_playing());
    assert_eq!(harness.wavesurfer.renderer().progress(), 1.0);

    harness.wavesurfer.play()?;
    assert_eq!(harness.wavesurfer.current_time(), 0.0);
    Ok(())
}

#[test]
fn stop_and_skip() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.skip(3.0);
    harness.wavesurfer.skip(-1.0);
    assert_eq!(harness.wavesurfer.current_time(), 2.0);
    assert!(harness.events().contains(&WaveSurferEvent::TimeUpdate { time: 2.0 }));

    harness.wavesurfer.play()?;
    harness.wavesurfer.stop();
    assert!(!harness.wavesurfer.is_playing());
    assert_eq!(harness.wavesurfer.current_time(), 0.0);
    assert_eq!(harness.wavesurfer.renderer().progress(), 0.0);
    Ok(())
}

#[test]
fn play_pause_toggles() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.play_pause()?;
    assert!(harness.wavesurfer.is_playing());
    harness.wavesurfer.play_pause()?;
    assert!(!harness.wavesurfer.is_playing());
    assert_eq!(harness.count(WaveSurferEventKind::Play), 1);
    assert_eq!(harness.count(WaveSurferEventKind::Pause), 1);
    Ok(())
}

#[test]
fn audio_rate_scales_playback() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.set_options(OptionsPatch {
        audio_rate: Some(2.0),
        ..Default::default()
    })?;
    assert_eq!(harness.wavesurfer.playback_rate(), 2.0);

    harness.wavesurfer.play()?;
    harness.run_for(1000);
    let time = harness.wavesurfer.current_time();
    assert!((time - 2.0).abs() < 0.05, "time {time}");
    Ok(())
}

#[test]
fn volume_and_mute_reach_the_element() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(100)], 2.0)?;
    harness.wavesurfer.set_volume(0.25);
    harness.wavesurfer.set_muted(true);
    harness.wavesurfer.set_sink_id("speakers")?;

    assert_eq!(harness.media.volume(), 0.25);
    assert!(harness.media.muted());
    assert_eq!(harness.media.sink_id(), "speakers");
    assert_eq!(harness.wavesurfer.volume(), 0.25);
    assert!(harness.wavesurfer.muted());
    Ok(())
}

#[test]
fn zoom_keeps_the_time_under_the_cursor() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(2000)], 10.0)?;
    harness.wavesurfer.seek_to(0.5);
    let cursor_before = 0.5 * harness.wavesurfer.width() - harness.wavesurfer.scroll();

    harness.wavesurfer.zoom(100.0)?;

    assert_eq!(harness.wavesurfer.width(), 1000.0);
    assert_eq!(harness.wavesurfer.duration(), 10.0);
    assert_eq!(harness.wavesurfer.current_time(), 5.0);
    let cursor_after = 0.5 * harness.wavesurfer.width() - harness.wavesurfer.scroll();
    assert!((cursor_after - cursor_before).abs() < 1.0);
    assert!(harness.wavesurfer.scroll() > 0.0);
    assert!(harness.wavesurfer.scroll() + CONTAINER_WIDTH <= 1000.0);
    Ok(())
}

#[test]
fn set_scroll_time_reports_visible_window() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(2000)], 10.0)?;
    harness.wavesurfer.zoom(100.0)?;
    harness.clear_log();

    harness.wavesurfer.set_scroll_time(4.0);
    assert_eq!(harness.wavesurfer.scroll(), 400.0);
    let scroll = harness
        .events()
        .into_iter()
        .find(|event| matches!(event, WaveSurferEvent::Scroll { .. }));
    match scroll {
        Some(WaveSurferEvent::Scroll { start, end, .. }) => {
            assert!((start - 4.0).abs() < 1e-9);
            assert!((end - 8.0).abs() < 1e-9);
        }
        other => panic!("expected a scroll event, got {other:?}"),
    }
    Ok(())
}

#[test]
fn destroy_leaves_nothing_scheduled() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(800)], 8.0)?;
    harness.wavesurfer.play()?;
    harness.run_for(500);
    harness.wavesurfer.destroy();

    assert_eq!(harness.count(WaveSurferEventKind::Destroy), 1);
    assert!(harness.wavesurfer.is_destroyed());
    assert!(harness.media.is_removed());
    assert_eq!(harness.host.pending_timers(), 0);
    assert_eq!(harness.host.pending_frames(), 0);

    harness.clear_log();
    harness.host.advance(Duration::from_secs(5));
    assert!(harness.events().is_empty());
    Ok(())
}
