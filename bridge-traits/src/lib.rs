//! # Host Bridge Traits
//!
//! Contracts between the recitation playback core and the host application.
//!
//! The core decides *what* to play and *when*; the host owns the sound output
//! and the log pipeline. Each capability is a trait the host implements:
//!
//! - [`AudioDevice`](playback::AudioDevice) - provisions one
//!   [`MediaSession`](playback::MediaSession) per playable resource and reports
//!   its lifecycle through a [`DeviceEventSink`](playback::DeviceEventSink)
//! - [`LoggerSink`](log::LoggerSink) - mirrors structured logs into host logging
//!
//! All bridge operations report failures as [`BridgeError`].
//!
//! ## Thread Safety
//!
//! On native targets every bridge object must be `Send + Sync` (see
//! [`platform`]). WebAssembly hosts are single-threaded and carry no bounds.

pub mod error;
pub mod log;
pub mod platform;
pub mod playback;

pub use error::BridgeError;

pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{
    AudioDevice, DeviceEvent, DeviceEventSink, MediaRequest, MediaSession, PlaybackMetadata,
    PlaybackOptions,
};
