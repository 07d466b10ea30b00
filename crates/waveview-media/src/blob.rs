//! Binary blobs and object URLs.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// Immutable bytes with a MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Arc<[u8]>,
    mime_type: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Same bytes under another MIME type.
    pub fn with_mime_type(&self, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: Arc::clone(&self.bytes),
            mime_type: mime_type.into(),
        }
    }
}

/// Creates and revokes object URLs for blobs.
pub trait BlobUrls: Send + Sync {
    fn create_object_url(&self, blob: &Blob) -> String;
    fn revoke_object_url(&self, url: &str);
}

/// In-process object URL table: `blob:waveview/<uuid>` URLs.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    urls: Arc<Mutex<HashMap<String, Blob>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.urls.lock().get(url).cloned()
    }

    /// Number of URLs created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.urls.lock().len()
    }
}

impl BlobUrls for BlobRegistry {
    fn create_object_url(&self, blob: &Blob) -> String {
        let url = format!("blob:waveview/{}", Uuid::new_v4());
        trace!(%url, bytes = blob.len(), "object url created");
        self.urls.lock().insert(url.clone(), blob.clone());
        url
    }

    fn revoke_object_url(&self, url: &str) {
        if self.urls.lock().remove(url).is_some() {
            trace!(%url, "object url revoked");
        }
    }
}
