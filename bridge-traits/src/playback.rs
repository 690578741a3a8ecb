//! Audio device bridge traits.
//!
//! The core never decodes audio itself. A host (browser `HTMLAudioElement`,
//! AVPlayer, ExoPlayer, a rodio sink on desktop) owns the actual sound output
//! and exposes it through [`AudioDevice`]. Each call to [`AudioDevice::open`]
//! provisions one [`MediaSession`] pointed at a single resource; lifecycle
//! notifications flow back through the [`DeviceEventSink`] handed to `open`.
//!
//! Transport commands are fire-and-forget: a host acknowledges them by
//! emitting [`DeviceEvent`]s (for instance `Started` once the first frame is
//! audible), never by blocking the caller.

use crate::{
    error::Result,
    platform::{PlatformSend, PlatformSendSync},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Options applied when a media session is provisioned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Initial playback position (defaults to start of stream).
    pub start_position: Duration,
    /// Initial volume (0.0 = muted, 1.0 = unity gain).
    pub initial_volume: f32,
    /// Whether the host should start playback as soon as the resource is ready.
    pub autoplay: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            start_position: Duration::from_secs(0),
            initial_volume: 1.0,
            autoplay: true,
        }
    }
}

/// Descriptive metadata for platform media sessions (lock screen, notification
/// center, SMTC).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackMetadata {
    /// Chapter the resource belongs to.
    pub chapter: Option<u16>,
    /// Verse number, `None` for chapter-wide resources.
    pub verse: Option<u32>,
    /// Reciter identifier used to resolve the resource.
    pub reciter_id: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Arbitrary extra fields (e.g., artwork URI).
    pub extra: HashMap<String, String>,
}

/// Request describing the single resource a media session plays.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    /// Absolute URL of the playable resource.
    pub url: String,
    /// Options such as initial volume.
    pub options: PlaybackOptions,
    /// Metadata surfaced to the host.
    pub metadata: PlaybackMetadata,
}

impl MediaRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: PlaybackOptions::default(),
            metadata: PlaybackMetadata::default(),
        }
    }

    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Lifecycle notifications emitted by a media session.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Playback actually started (first frame rendered).
    Started,
    /// Stream metadata became available.
    MetadataLoaded { duration: Duration },
    /// Periodic progress tick.
    TimeUpdate {
        current_time: Duration,
        duration: Option<Duration>,
    },
    /// The resource played through to its natural end.
    Ended,
    /// Loading or playback failed (network failure, unsupported codec, 404).
    Error { message: String },
}

impl DeviceEvent {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceEvent::Started => "started",
            DeviceEvent::MetadataLoaded { .. } => "metadata-loaded",
            DeviceEvent::TimeUpdate { .. } => "time-update",
            DeviceEvent::Ended => "ended",
            DeviceEvent::Error { .. } => "error",
        }
    }
}

/// Receiver of [`DeviceEvent`]s for one media session.
///
/// Hosts call `emit` from whatever thread their audio callbacks run on. Once
/// the owning session has been torn down the sink silently discards events.
pub trait DeviceEventSink: PlatformSendSync {
    fn emit(&self, event: DeviceEvent);
}

/// A single provisioned playback of one resource.
pub trait MediaSession: PlatformSend {
    /// Begin playback. Completion is confirmed by [`DeviceEvent::Started`].
    fn play(&mut self) -> Result<()>;

    /// Pause without releasing the resource.
    fn pause(&mut self) -> Result<()>;

    /// Resume from the paused position.
    fn resume(&mut self) -> Result<()>;

    /// Jump to an absolute position.
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Adjust volume, normalized to `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Stop playback and release native resources. Must be idempotent; may
    /// finish asynchronously on the host side.
    fn teardown(&mut self);
}

/// Factory for media sessions backed by the platform's sound output.
pub trait AudioDevice: PlatformSendSync {
    /// Provision a session for `request`, reporting lifecycle events to
    /// `events`.
    fn open(
        &self,
        request: MediaRequest,
        events: Arc<dyn DeviceEventSink>,
    ) -> Result<Box<dyn MediaSession>>;
}
