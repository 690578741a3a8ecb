//! # Playback Device Adapter
//!
//! Wraps exactly one [`MediaSession`] together with the listener that feeds
//! its lifecycle events back to the orchestrator.
//!
//! Every adapter carries a generation number. Its listener tags events with
//! that generation and pushes them into the orchestrator's queue. Teardown
//! detaches the listener *before* releasing the native session, so a slow
//! host that fires `ended` after teardown is silenced at the source. Events
//! that were already queued are rejected by the orchestrator by comparing
//! generations.
//!
//! Within one adapter, messages also carry a seek epoch. Each seek starts a
//! new epoch, so progress ticks queued before the seek can be told apart from
//! ticks measured from the new position.

use crate::error::Result;
use bridge_traits::{
    AudioDevice, DeviceEvent, DeviceEventSink, MediaRequest, MediaSession,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

/// A device event tagged with the generation of the adapter that produced it
/// and the seek epoch it was emitted in.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterMessage {
    pub generation: u64,
    pub seek_epoch: u64,
    pub event: DeviceEvent,
}

struct AdapterListener {
    generation: u64,
    attached: AtomicBool,
    seek_epoch: AtomicU64,
    sender: UnboundedSender<AdapterMessage>,
}

impl AdapterListener {
    fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

impl DeviceEventSink for AdapterListener {
    fn emit(&self, event: DeviceEvent) {
        if !self.attached.load(Ordering::SeqCst) {
            trace!(
                generation = self.generation,
                kind = event.kind(),
                "Discarding event from detached session"
            );
            return;
        }

        // The receiver lives as long as the orchestrator; a send error only
        // means the view is gone.
        let _ = self.sender.send(AdapterMessage {
            generation: self.generation,
            seek_epoch: self.seek_epoch.load(Ordering::SeqCst),
            event,
        });
    }
}

/// The single live playback device of an orchestrator.
pub(crate) struct DeviceAdapter {
    generation: u64,
    url: String,
    session: Box<dyn MediaSession>,
    listener: Arc<AdapterListener>,
    torn_down: bool,
}

impl DeviceAdapter {
    /// Provisions a session for `request` on `device`.
    pub(crate) fn open(
        device: &dyn AudioDevice,
        request: MediaRequest,
        generation: u64,
        sender: UnboundedSender<AdapterMessage>,
    ) -> Result<Self> {
        let url = request.url.clone();
        let listener = Arc::new(AdapterListener {
            generation,
            attached: AtomicBool::new(true),
            seek_epoch: AtomicU64::new(0),
            sender,
        });

        let session = device.open(request, listener.clone())?;
        debug!(generation, "Device adapter created");

        Ok(Self {
            generation,
            url,
            session,
            listener,
            torn_down: false,
        })
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn play(&mut self) -> Result<()> {
        Ok(self.session.play()?)
    }

    pub(crate) fn pause(&mut self) -> Result<()> {
        Ok(self.session.pause()?)
    }

    pub(crate) fn resume(&mut self) -> Result<()> {
        Ok(self.session.resume()?)
    }

    pub(crate) fn seek_epoch(&self) -> u64 {
        self.listener.seek_epoch.load(Ordering::SeqCst)
    }

    /// Starts a new seek epoch, then repositions the session. Events emitted
    /// from here on carry the new epoch.
    pub(crate) fn seek(&mut self, position: Duration) -> Result<()> {
        let epoch = self.listener.seek_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(generation = self.generation, epoch, "Seek epoch started");
        Ok(self.session.seek(position)?)
    }

    pub(crate) fn set_volume(&mut self, volume: f32) -> Result<()> {
        Ok(self.session.set_volume(volume)?)
    }

    /// Detaches the listener, then releases the session. Idempotent.
    pub(crate) fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.listener.detach();
        self.session.teardown();
        debug!(generation = self.generation, "Device adapter torn down");
    }
}

impl Drop for DeviceAdapter {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for DeviceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAdapter")
            .field("generation", &self.generation)
            .field("url", &core_runtime::logging::redact_url(&self.url))
            .field("torn_down", &self.torn_down)
            .finish()
    }
}
