//! # Playback Error Types

use thiserror::Error;

/// Errors surfaced by the recitation playback core.
///
/// Invalid transport requests (`resume` with nothing paused, `next` past the
/// last verse, `seek` before the duration is known) are not errors; those
/// operations are silent no-ops.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// Reciter id is not part of the registry.
    #[error("Unknown reciter: {0}")]
    UnknownReciter(String),

    /// Chapter number outside `1..=114`.
    #[error("Invalid chapter number: {0}")]
    InvalidChapter(u16),

    /// Verse numbers are 1-based.
    #[error("Invalid verse number: {0}")]
    InvalidVerse(u32),

    /// The requested verse is not part of the supplied verse list.
    #[error("Verse {verse} is not part of the verse list for chapter {chapter}")]
    VerseNotInContext { chapter: u16, verse: u32 },

    /// No resource URL was supplied and no chapter is known to resolve one.
    #[error("Cannot resolve audio for verse {0}: no chapter context")]
    MissingChapter(u32),

    /// The resolver could not produce a URL.
    #[error("Resource resolution failed: {0}")]
    Resolution(String),

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// The host device rejected a command.
    #[error("Audio device error: {0}")]
    Device(#[from] bridge_traits::BridgeError),

    /// A resource failed to load or play.
    #[error("Failed to load {url}: {message}")]
    LoadFailed { url: String, message: String },

    // ========================================================================
    // Argument Errors
    // ========================================================================
    /// Volume outside `0.0..=1.0`.
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    /// Seek target that is not a finite percentage.
    #[error("Invalid seek progress: {0}")]
    InvalidProgress(f64),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// The background playback task is gone (chapter view closed).
    #[error("Playback service is no longer running")]
    ServiceClosed,

    /// Configuration rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),
}

impl PlaybackError {
    /// `true` for errors raised while turning a verse into a URL. These point
    /// at a programming error in the caller, never at the network.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::UnknownReciter(_)
                | PlaybackError::InvalidChapter(_)
                | PlaybackError::InvalidVerse(_)
                | PlaybackError::VerseNotInContext { .. }
                | PlaybackError::MissingChapter(_)
                | PlaybackError::Resolution(_)
        )
    }

    /// `true` for failures reported by the audio device.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Device(_) | PlaybackError::LoadFailed { .. }
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
