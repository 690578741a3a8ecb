//! # Event Bus System
//!
//! Broadcasts playback notifications to every interested UI surface using
//! `tokio::sync::broadcast`.
//!
//! A chapter view typically has several consumers of the same playback
//! session: the per-verse play button, the floating transport bar and the
//! reciter settings panel. Each of them subscribes to the [`EventBus`]
//! independently; none of them talks to the playback device directly.
//!
//! ```text
//! ┌──────────────┐   emit    ┌──────────┐  subscribe  ┌──────────────────┐
//! │ Orchestrator ├──────────>│ EventBus ├────────────>│ verse controls   │
//! └──────────────┘           │          ├────────────>│ transport bar    │
//!                            │          ├────────────>│ settings panel   │
//!                            └──────────┘             └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::VerseCompleted { verse: 3 })).ok();
//! assert_eq!(
//!     rx.recv().await.unwrap(),
//!     CoreEvent::Playback(PlaybackEvent::VerseCompleted { verse: 3 })
//! );
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events (time updates
//!   are frequent, so slow consumers will see this). Non-fatal.
//! - **`RecvError::Closed`**: every sender has been dropped; the chapter view
//!   is gone.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback lifecycle notifications.
    Playback(PlaybackEvent),
    /// Reciter selection changes.
    Reciter(ReciterEvent),
}

impl CoreEvent {
    /// Human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Reciter(e) => e.description(),
        }
    }

    /// Severity used for filtering and logging.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::SessionCompleted { .. }) => EventSeverity::Info,
            CoreEvent::Reciter(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by a playback orchestrator.
///
/// Verse numbers use `-1` for chapter-wide playback, matching the published
/// `AudioState`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The observable playback state changed.
    StateChanged {
        is_playing: bool,
        is_paused: bool,
        /// Active verse, `-1` for chapter-wide playback, `None` when idle.
        verse: Option<i32>,
        /// Active chapter, if any.
        chapter: Option<u16>,
        /// Mode label (`none`, `single-verse`, `auto-sequential`, `complete-chapter`).
        mode: String,
    },
    /// A single resource finished playing naturally.
    VerseCompleted {
        /// Finished verse, `-1` for a chapter-wide resource.
        verse: i32,
    },
    /// A playback session ran to completion.
    SessionCompleted {
        /// Mode label of the completed session.
        mode: String,
    },
    /// Progress tick from the device.
    PositionChanged { position_ms: u64, duration_ms: u64 },
    /// Loading or playback failed; the orchestrator is idle again.
    Error { message: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::VerseCompleted { .. } => "Verse finished",
            PlaybackEvent::SessionCompleted { .. } => "Playback session completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

/// Events related to reciter selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ReciterEvent {
    /// A different reciter was selected for future playback.
    Selected { reciter_id: String },
}

impl ReciterEvent {
    fn description(&self) -> &str {
        match self {
            ReciterEvent::Selected { .. } => "Reciter selected",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning the bus yields another producer for the same channel; every
/// [`subscribe`](EventBus::subscribe) creates an independent receiver that
/// sees events published after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers reached, or an error when nobody is
    /// listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
///
/// let bus = EventBus::new(16);
/// // The transport bar does not care about progress ticks.
/// let stream = EventStream::new(bus.subscribe()).filter(|event| {
///     !matches!(event, CoreEvent::Playback(PlaybackEvent::PositionChanged { .. }))
/// });
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned from `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](EventStream::recv). Returns `None` when
    /// no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
