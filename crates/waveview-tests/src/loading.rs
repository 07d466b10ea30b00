//! Integration tests for the load pipeline: fetch, decode, render.

use crate::harness::{ramp, Harness, CONTAINER, CONTAINER_WIDTH};
use std::sync::Arc;
use waveview::{
    MemoryFetcher, WaveSurfer, WaveSurferConfig, WaveSurferEvent, WaveSurferEventKind,
    WaveSurferOptions,
};
use waveview_core::{VirtualLoop, WaveviewError};
use waveview_media::{Blob, MediaElement, MediaHandle, SimulatedMedia};
use waveview_render::{ExportPeaksOptions, HeadlessHost, HeadlessSurface, TileLayer};

fn pcm(samples: &[f32]) -> Blob {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    Blob::new(bytes, "audio/pcm")
}

#[test]
fn peaks_with_duration_render_without_fetching() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(1000)], 12.5)?;

    assert_eq!(format!("{:.2}", harness.wavesurfer.duration()), "12.50");
    assert!(harness.fetcher.requests().is_empty());
    assert!(harness.surface.tile_count(TileLayer::Wave) > 0);
    assert!(harness.events().contains(&WaveSurferEvent::Ready { duration: 12.5 }));
    assert_eq!(harness.count(WaveSurferEventKind::Redraw), 1);
    assert_eq!(harness.count(WaveSurferEventKind::RedrawComplete), 1);
    Ok(())
}

#[test]
fn startup_events_arrive_in_order() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(200)], 4.0)?;
    let kinds = harness.kinds();
    let order = [
        WaveSurferEventKind::Init,
        WaveSurferEventKind::Load,
        WaveSurferEventKind::Decode,
        WaveSurferEventKind::Redraw,
        WaveSurferEventKind::RedrawComplete,
        WaveSurferEventKind::Ready,
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|kind| kinds.iter().position(|k| k == kind).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{kinds:?}");
    Ok(())
}

#[tokio::test]
async fn url_is_fetched_decoded_and_rendered() -> anyhow::Result<()> {
    let harness = Harness::new(WaveSurferOptions::default())?;
    harness.fetcher.insert("speech.pcm", pcm(&ramp(16_000)));

    harness.wavesurfer.load("speech.pcm", None, None).await?;

    let decoded = harness.wavesurfer.decoded_data().unwrap();
    assert_eq!(decoded.len(), 16_000);
    assert_eq!(harness.wavesurfer.duration(), 2.0);
    assert!(harness.media.src().starts_with("blob:waveview/"));

    let loading: Vec<f64> = harness
        .events()
        .iter()
        .filter_map(|event| match event {
            WaveSurferEvent::Loading { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(loading.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(loading.last(), Some(&100.0));
    assert_eq!(harness.kinds().last(), Some(&WaveSurferEventKind::Ready));
    Ok(())
}

#[tokio::test]
async fn fetch_headers_are_forwarded() -> anyhow::Result<()> {
    let mut options = WaveSurferOptions::default();
    options.fetch_params = options.fetch_params.with_header("Authorization", "Bearer abc");
    let harness = Harness::new(options)?;
    harness.fetcher.insert("private.pcm", pcm(&ramp(800)));

    harness.wavesurfer.load("private.pcm", None, None).await?;

    let requests = harness.fetcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1.headers["Authorization"], "Bearer abc");
    Ok(())
}

#[tokio::test]
async fn failed_load_reports_error() -> anyhow::Result<()> {
    let harness = Harness::new(WaveSurferOptions::default())?;
    let err = harness.wavesurfer.load("gone.pcm", None, None).await.unwrap_err();

    assert!(matches!(err, WaveviewError::Fetch(_)));
    assert_eq!(harness.count(WaveSurferEventKind::Error), 1);
    assert_eq!(harness.count(WaveSurferEventKind::Ready), 0);
    Ok(())
}

#[tokio::test]
async fn blob_load_skips_fetch() -> anyhow::Result<()> {
    let harness = Harness::new(WaveSurferOptions::default())?;
    harness.wavesurfer.load_blob(pcm(&ramp(4000)), None, None).await?;

    assert!(harness.fetcher.requests().is_empty());
    assert_eq!(harness.wavesurfer.duration(), 0.5);
    assert!(harness.media.src().starts_with("blob:waveview/"));
    Ok(())
}

#[test]
fn reloading_pauses_owned_media() -> anyhow::Result<()> {
    let harness = Harness::with_peaks(vec![ramp(400)], 10.0)?;
    harness.wavesurfer.play()?;
    harness.run_for(200);
    assert!(harness.wavesurfer.is_playing());

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    runtime.block_on(harness.wavesurfer.load("next.wav", Some(waveview_core::Peaks(vec![ramp(100)])), Some(3.0)))?;

    assert!(!harness.wavesurfer.is_playing());
    assert_eq!(harness.wavesurfer.duration(), 10.0);
    assert_eq!(harness.wavesurfer.decoded_data().unwrap().duration, 3.0);
    Ok(())
}

#[test]
fn exported_peaks_reload_into_a_fresh_instance() -> anyhow::Result<()> {
    let first = Harness::with_peaks(vec![ramp(4000), ramp(4000)], 6.0)?;
    let peaks = first.wavesurfer.export_peaks(&ExportPeaksOptions {
        max_length: 500,
        ..Default::default()
    })?;
    assert_eq!(peaks.0.len(), 2);
    assert!(peaks.0.iter().all(|channel| channel.len() == 500));

    let second = Harness::with_peaks(peaks.0, 6.0)?;
    assert_eq!(second.wavesurfer.duration(), 6.0);
    assert_eq!(second.wavesurfer.decoded_data().unwrap().num_channels(), 2);
    Ok(())
}

#[test]
fn borrowed_media_survives_destroy() -> anyhow::Result<()> {
    let host = VirtualLoop::new();
    let surface = HeadlessSurface::new(CONTAINER_WIDTH, 1.0);
    let surfaces = HeadlessHost::new().with_container(CONTAINER, surface.clone());
    let media = SimulatedMedia::new().with_duration("shared.wav", 5.0);
    media.set_src("shared.wav");

    let options = WaveSurferOptions {
        peaks: Some(waveview_core::Peaks(vec![ramp(300)])),
        duration: Some(5.0),
        ..Default::default()
    };
    let wavesurfer = WaveSurfer::create(
        WaveSurferConfig::new(CONTAINER, Arc::new(surfaces), Arc::new(host.clone()))
            .with_options(options)
            .with_media(MediaHandle::Borrowed(Arc::new(media.clone())))
            .with_fetcher(Arc::new(MemoryFetcher::new())),
    )?;
    host.flush();
    assert_eq!(wavesurfer.duration(), 5.0);

    wavesurfer.destroy();
    assert!(!media.is_removed());
    assert_eq!(media.src(), "shared.wav");
    assert!(!surface.is_mounted());
    Ok(())
}

#[test]
fn missing_container_is_fatal() {
    let host = VirtualLoop::new();
    let config = WaveSurferConfig::new("#nowhere", Arc::new(HeadlessHost::new()), Arc::new(host));
    let result = WaveSurfer::create(config);
    assert!(matches!(result, Err(WaveviewError::ContainerNotFound(_))));
}
