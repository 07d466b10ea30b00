//! Instance-scoped plugins.

use crate::wavesurfer::{WaveSurfer, WeakWaveSurfer};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use waveview_core::{Event, EventBus, Result, Subscription, Subscriptions};

/// Events a plugin publishes to whoever holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PluginEvent {
    Destroy,
    /// Plugin-specific notification.
    Custom { name: String, payload: serde_json::Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginEventKind {
    Destroy,
    Custom,
}

impl Event for PluginEvent {
    type Kind = PluginEventKind;

    fn kind(&self) -> PluginEventKind {
        match self {
            PluginEvent::Destroy => PluginEventKind::Destroy,
            PluginEvent::Custom { .. } => PluginEventKind::Custom,
        }
    }
}

/// State every plugin shares: its event bus, the subscriptions it holds on
/// the instance, and a weak handle to that instance.
#[derive(Default)]
pub struct PluginBase {
    events: EventBus<PluginEvent>,
    subscriptions: Mutex<Subscriptions>,
    wavesurfer: Mutex<Option<WeakWaveSurfer>>,
}

impl PluginBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &EventBus<PluginEvent> {
        &self.events
    }

    pub fn emit(&self, event: PluginEvent) {
        self.events.emit(event);
    }

    /// Keep `subscription` until the plugin is destroyed.
    pub fn hold(&self, subscription: Subscription) {
        self.subscriptions.lock().push(subscription);
    }

    /// The instance the plugin is registered with, while it is alive.
    pub fn wavesurfer(&self) -> Option<WaveSurfer> {
        self.wavesurfer.lock().as_ref().and_then(WeakWaveSurfer::upgrade)
    }

    fn attach(&self, wavesurfer: &WaveSurfer) {
        *self.wavesurfer.lock() = Some(wavesurfer.downgrade());
    }

    fn teardown(&self) {
        self.emit(PluginEvent::Destroy);
        self.subscriptions.lock().clear();
        self.events.clear();
        self.wavesurfer.lock().take();
    }
}

/// A plugin extends an instance through its public surface.
///
/// Implementors provide [`Plugin::base`] and usually [`Plugin::on_init`];
/// `init` and `destroy` have the bookkeeping built in.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn base(&self) -> &PluginBase;

    /// Hook up to the instance. Subscriptions go through [`PluginBase::hold`].
    fn on_init(&self, _wavesurfer: &WaveSurfer) -> Result<()> {
        Ok(())
    }

    fn init(&self, wavesurfer: &WaveSurfer) -> Result<()> {
        self.base().attach(wavesurfer);
        debug!(plugin = self.name(), "plugin initialised");
        self.on_init(wavesurfer)
    }

    /// Emit `Destroy`, then drop every subscription and listener.
    fn destroy(&self) {
        debug!(plugin = self.name(), "plugin destroyed");
        self.base().teardown();
    }
}

/// Whether two handles point at the same plugin.
pub(crate) fn same_plugin(a: &Arc<dyn Plugin>, b: &Arc<dyn Plugin>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
