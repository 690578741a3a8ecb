//! # Core Configuration Module
//!
//! Builder-based configuration for the recitation playback core.
//!
//! ## Required Dependencies
//!
//! - `AudioDevice` - the host's sound output; there is no usable default.
//!
//! ## Optional Dependencies
//!
//! - `LoggerSink` - mirrors core logs into the host's logging pipeline.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, PlaybackSettings};
//! use std::sync::Arc;
//!
//! let settings = PlaybackSettings::from_json_str(r#"{ "default_reciter": "husary" }"#)?;
//! let config = CoreConfig::builder()
//!     .audio_device(Arc::new(MyAudioDevice::new()))
//!     .settings(settings)
//!     .build()?;
//! ```
//!
//! Building without an audio device fails fast with an actionable message:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing audio device");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AudioDevice, LoggerSink};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Reciter whose verse-level assets are used when the selected reciter has
/// none.
pub const DEFAULT_VERSE_FALLBACK_RECITER: &str = "alafasy";

/// Pause between consecutive verses in auto-sequential mode.
pub const DEFAULT_INTER_VERSE_DELAY_MS: u64 = 1_000;

const MAX_INTER_VERSE_DELAY_MS: u64 = 10_000;

/// Tunable playback settings, typically persisted by the host's settings panel
/// as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Delay between verses in auto-sequential mode, in milliseconds.
    pub inter_verse_delay_ms: u64,

    /// Reciter selected when a chapter view opens. `None` selects the first
    /// registry entry.
    pub default_reciter: Option<String>,

    /// Reciter providing verse-level audio for reciters without it.
    pub verse_fallback_reciter: String,

    /// Volume applied to every new media session, `0.0..=1.0`.
    pub initial_volume: f32,

    /// Per-subscriber buffer of the event bus.
    pub event_buffer_size: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            inter_verse_delay_ms: DEFAULT_INTER_VERSE_DELAY_MS,
            default_reciter: None,
            verse_fallback_reciter: DEFAULT_VERSE_FALLBACK_RECITER.to_string(),
            initial_volume: 1.0,
            event_buffer_size: crate::events::DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl PlaybackSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serializes the settings for persistence.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn inter_verse_delay(&self) -> Duration {
        Duration::from_millis(self.inter_verse_delay_ms)
    }

    /// Checks value ranges. Reciter ids are checked against the registry when
    /// an orchestrator is built.
    pub fn validate(&self) -> Result<()> {
        if self.inter_verse_delay_ms > MAX_INTER_VERSE_DELAY_MS {
            return Err(Error::Config(format!(
                "Inter-verse delay {}ms exceeds maximum of {}ms",
                self.inter_verse_delay_ms, MAX_INTER_VERSE_DELAY_MS
            )));
        }

        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(Error::Config(format!(
                "Initial volume {} must be between 0.0 and 1.0",
                self.initial_volume
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.verse_fallback_reciter.trim().is_empty() {
            return Err(Error::Config(
                "Verse fallback reciter cannot be empty".to_string(),
            ));
        }

        if matches!(&self.default_reciter, Some(id) if id.trim().is_empty()) {
            return Err(Error::Config(
                "Default reciter cannot be an empty id".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration: host capabilities plus playback settings.
#[derive(Clone)]
pub struct CoreConfig {
    /// Host sound output (required).
    pub audio_device: Arc<dyn AudioDevice>,

    /// Host log pipeline (optional).
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    pub settings: PlaybackSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("audio_device", &"AudioDevice { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("settings", &self.settings)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()
    }
}

fn audio_device_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioDevice".to_string(),
        message: "An AudioDevice implementation is required for playback. \
                 Web: wrap HTMLAudioElement. \
                 Mobile: inject an AVPlayer/ExoPlayer-backed device. \
                 Tests: inject a fake device."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    audio_device: Option<Arc<dyn AudioDevice>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    settings: PlaybackSettings,
}

impl CoreConfigBuilder {
    pub fn audio_device(mut self, device: Arc<dyn AudioDevice>) -> Self {
        self.audio_device = Some(device);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Replaces all settings at once.
    pub fn settings(mut self, settings: PlaybackSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn inter_verse_delay(mut self, delay: Duration) -> Self {
        self.settings.inter_verse_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn default_reciter(mut self, reciter_id: impl Into<String>) -> Self {
        self.settings.default_reciter = Some(reciter_id.into());
        self
    }

    pub fn verse_fallback_reciter(mut self, reciter_id: impl Into<String>) -> Self {
        self.settings.verse_fallback_reciter = reciter_id.into();
        self
    }

    pub fn initial_volume(mut self, volume: f32) -> Self {
        self.settings.initial_volume = volume;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.settings.event_buffer_size = size;
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<CoreConfig> {
        let audio_device = self.audio_device.ok_or_else(audio_device_missing_error)?;

        let config = CoreConfig {
            audio_device,
            logger_sink: self.logger_sink,
            settings: self.settings,
        };
        config.validate()?;
        Ok(config)
    }
}
