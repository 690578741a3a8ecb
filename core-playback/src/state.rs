//! Observable playback state and the internal phase machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the active resource covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiveVerse {
    /// A single verse, by number.
    Verse(u32),
    /// The whole chapter (complete-chapter mode).
    WholeChapter,
}

impl ActiveVerse {
    /// Wire representation: the verse number, or `-1` for chapter-wide.
    pub fn as_i32(self) -> i32 {
        match self {
            ActiveVerse::Verse(n) => i32::try_from(n).unwrap_or(i32::MAX),
            ActiveVerse::WholeChapter => -1,
        }
    }

    pub fn verse_number(self) -> Option<u32> {
        match self {
            ActiveVerse::Verse(n) => Some(n),
            ActiveVerse::WholeChapter => None,
        }
    }
}

/// Playback mode of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackMode {
    #[default]
    None,
    SingleVerse,
    AutoSequential,
    CompleteChapter,
}

impl PlaybackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMode::None => "none",
            PlaybackMode::SingleVerse => "single-verse",
            PlaybackMode::AutoSequential => "auto-sequential",
            PlaybackMode::CompleteChapter => "complete-chapter",
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal phase of the state machine. Consumers only see the
/// `is_playing`/`is_paused` pair of [`AudioState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackPhase {
    Idle,
    /// Adapter created, waiting for the device to confirm playback.
    Loading,
    Playing,
    Paused,
    /// Resource finished; only held while an auto-advance is pending.
    Ended,
    /// Transient: set while a failure is reported, then `Idle`.
    Error,
}

/// The single source of truth published to every UI surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioState {
    pub is_playing: bool,
    pub is_paused: bool,
    pub current_verse: Option<ActiveVerse>,
    pub current_mode: PlaybackMode,
    /// Percentage in `0.0..=100.0`.
    pub progress: f64,
    /// Seconds, `0.0` while unknown.
    pub duration: f64,
    /// Seconds.
    pub current_time: f64,
    /// Chapter of the active resource.
    pub chapter: Option<u16>,
}

impl Default for AudioState {
    fn default() -> Self {
        Self::idle()
    }
}

impl AudioState {
    pub fn idle() -> Self {
        Self {
            is_playing: false,
            is_paused: false,
            current_verse: None,
            current_mode: PlaybackMode::None,
            progress: 0.0,
            duration: 0.0,
            current_time: 0.0,
            chapter: None,
        }
    }

    /// State right after a new resource was requested.
    pub(crate) fn loading(mode: PlaybackMode, verse: ActiveVerse, chapter: Option<u16>) -> Self {
        Self {
            is_playing: true,
            current_verse: Some(verse),
            current_mode: mode,
            chapter,
            ..Self::idle()
        }
    }

    /// `current_verse` as published on the wire (`-1` for chapter-wide).
    pub fn current_verse_number(&self) -> Option<i32> {
        self.current_verse.map(ActiveVerse::as_i32)
    }

    pub fn is_idle(&self) -> bool {
        self.current_mode == PlaybackMode::None
    }

    /// Recomputes `progress` from `current_time` and `duration`.
    pub(crate) fn set_position(&mut self, current_time: f64, duration: f64) {
        self.current_time = current_time.max(0.0);
        self.duration = duration.max(0.0);
        self.progress = if self.duration > 0.0 {
            (self.current_time / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Checks the relationships every published state satisfies.
    pub fn is_consistent(&self) -> bool {
        let exclusive = !(self.is_playing && self.is_paused);
        let idle_shape = (self.current_mode == PlaybackMode::None)
            == (self.current_verse.is_none() && !self.is_playing && !self.is_paused);
        let ranges = (0.0..=100.0).contains(&self.progress)
            && self.duration >= 0.0
            && self.current_time >= 0.0;
        exclusive && idle_shape && ranges
    }
}
