//! Audio byte retrieval.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use waveview_core::{Result, WaveviewError};
use waveview_media::Blob;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Receives download progress in percent.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Cancellation flag shared between a load and whoever may abort it.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(WaveviewError::Aborted)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn abort(&self) {
        self.signal.aborted.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchParams {
    pub headers: BTreeMap<String, String>,
    /// Set per load unless the host supplies its own.
    #[serde(skip)]
    pub signal: Option<AbortSignal>,
}

impl FetchParams {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Retrieves audio bytes for a URL.
pub trait Fetcher: Send + Sync {
    fn fetch_blob<'a>(
        &'a self,
        url: &'a str,
        on_progress: ProgressFn,
        params: &'a FetchParams,
    ) -> BoxFuture<'a, Result<Blob>>;
}

/// Wrap `progress` so reported percentages never go backwards.
pub fn monotonic(progress: ProgressFn) -> ProgressFn {
    let highest = Mutex::new(0.0f64);
    Arc::new(move |percent| {
        let percent = {
            let mut highest = highest.lock();
            *highest = highest.max(percent.clamp(0.0, 100.0));
            *highest
        };
        progress(percent);
    })
}

/// Serves registered blobs from memory, reporting progress per chunk.
#[derive(Clone)]
pub struct MemoryFetcher {
    blobs: Arc<Mutex<HashMap<String, Blob>>>,
    chunk_size: usize,
    requests: Arc<Mutex<Vec<(String, FetchParams)>>>,
}

impl Default for MemoryFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(Mutex::new(HashMap::new())),
            chunk_size: 64 * 1024,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn insert(&self, url: impl Into<String>, blob: Blob) {
        self.blobs.lock().insert(url.into(), blob);
    }

    /// Every fetch so far, oldest first.
    pub fn requests(&self) -> Vec<(String, FetchParams)> {
        self.requests.lock().clone()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch_blob<'a>(
        &'a self,
        url: &'a str,
        on_progress: ProgressFn,
        params: &'a FetchParams,
    ) -> BoxFuture<'a, Result<Blob>> {
        Box::pin(async move {
            self.requests.lock().push((url.to_string(), params.clone()));
            let blob = self
                .blobs
                .lock()
                .get(url)
                .cloned()
                .ok_or_else(|| WaveviewError::Fetch(format!("{url}: 404 Not Found")))?;

            let total = blob.len();
            let mut received = 0;
            while received < total {
                if let Some(signal) = &params.signal {
                    signal.check()?;
                }
                received = (received + self.chunk_size).min(total);
                on_progress(received as f64 / total as f64 * 100.0);
            }
            if total == 0 {
                on_progress(100.0);
            }
            debug!(%url, bytes = total, "fetched");
            Ok(blob)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<f64>>>, ProgressFn) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        (seen, Arc::new(move |p| s.lock().push(p)))
    }

    #[tokio::test]
    async fn test_memory_fetch_reports_chunked_progress() {
        let fetcher = MemoryFetcher::new().with_chunk_size(4);
        fetcher.insert("a.pcm", Blob::new(vec![0u8; 10], "audio/pcm"));
        let (seen, progress) = recorder();
        let params = FetchParams::default().with_header("Authorization", "token");

        let blob = fetcher.fetch_blob("a.pcm", progress, &params).await.unwrap();
        assert_eq!(blob.len(), 10);
        assert_eq!(*seen.lock(), vec![40.0, 80.0, 100.0]);
        assert_eq!(fetcher.requests()[0].1.headers["Authorization"], "token");
    }

    #[tokio::test]
    async fn test_missing_url_is_fetch_error() {
        let fetcher = MemoryFetcher::new();
        let (_, progress) = recorder();
        let err = fetcher
            .fetch_blob("nope", progress, &FetchParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WaveviewError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_aborted_fetch() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("a", Blob::new(vec![0u8; 4], "audio/pcm"));
        let controller = AbortController::new();
        controller.abort();
        let params = FetchParams {
            signal: Some(controller.signal()),
            ..Default::default()
        };
        let (_, progress) = recorder();
        let err = fetcher.fetch_blob("a", progress, &params).await.unwrap_err();
        assert!(matches!(err, WaveviewError::Aborted));
    }

    #[test]
    fn test_monotonic_progress() {
        let (seen, progress) = recorder();
        let progress = monotonic(progress);
        for p in [10.0, 50.0, 30.0, 120.0] {
            progress(p);
        }
        assert_eq!(*seen.lock(), vec![10.0, 50.0, 50.0, 100.0]);
    }
}
