//! # Playback Observers
//!
//! In-process callback surface of the orchestrator. Callbacks run
//! synchronously on the orchestrator's task, in the order the transitions
//! happen, so implementations must return quickly and must not block.

use crate::state::{ActiveVerse, AudioState, PlaybackMode};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, ReciterEvent};
use tracing::trace;

/// Receives playback notifications. Every method defaults to a no-op.
pub trait PlaybackObserver: Send + Sync {
    /// A single resource finished naturally (auto mode or not).
    fn on_verse_complete(&self, _verse: ActiveVerse) {}

    /// An auto-sequential run exhausted its list, or a single-verse or
    /// complete-chapter playback ended.
    fn on_session_complete(&self, _mode: PlaybackMode) {}

    /// Loading or playback failed; the orchestrator is idle again.
    fn on_error(&self, _message: &str) {}

    /// Progress tick, in seconds.
    fn on_time_update(&self, _current_time: f64, _duration: f64) {}

    /// Published state changed through a transition (not a progress tick).
    fn on_state_changed(&self, _state: &AudioState) {}

    fn on_reciter_changed(&self, _reciter_id: &str) {}
}

/// Forwards observer callbacks to the runtime [`EventBus`].
#[derive(Debug, Clone)]
pub struct EventBusObserver {
    bus: EventBus,
}

impl EventBusObserver {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is not an error for a broadcast notification.
        if self.bus.emit(event).is_err() {
            trace!("No event bus subscribers");
        }
    }
}

fn to_millis(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

impl PlaybackObserver for EventBusObserver {
    fn on_verse_complete(&self, verse: ActiveVerse) {
        self.emit(CoreEvent::Playback(PlaybackEvent::VerseCompleted {
            verse: verse.as_i32(),
        }));
    }

    fn on_session_complete(&self, mode: PlaybackMode) {
        self.emit(CoreEvent::Playback(PlaybackEvent::SessionCompleted {
            mode: mode.as_str().to_string(),
        }));
    }

    fn on_error(&self, message: &str) {
        self.emit(CoreEvent::Playback(PlaybackEvent::Error {
            message: message.to_string(),
        }));
    }

    fn on_time_update(&self, current_time: f64, duration: f64) {
        self.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
            position_ms: to_millis(current_time),
            duration_ms: to_millis(duration),
        }));
    }

    fn on_state_changed(&self, state: &AudioState) {
        self.emit(CoreEvent::Playback(PlaybackEvent::StateChanged {
            is_playing: state.is_playing,
            is_paused: state.is_paused,
            verse: state.current_verse_number(),
            chapter: state.chapter,
            mode: state.current_mode.as_str().to_string(),
        }));
    }

    fn on_reciter_changed(&self, reciter_id: &str) {
        self.emit(CoreEvent::Reciter(ReciterEvent::Selected {
            reciter_id: reciter_id.to_string(),
        }));
    }
}
