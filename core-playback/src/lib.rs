//! # Verse Playback Core
//!
//! Orchestrates recitation audio for one open chapter view.
//!
//! ## Overview
//!
//! This crate handles:
//! - Reciter registry and resource resolution (chapter-wide and per-verse URLs)
//! - The playback state machine with single-verse, auto-sequential and
//!   complete-chapter modes
//! - A device adapter that guarantees a single live media session
//! - Observer callbacks and a watch channel for UI surfaces
//! - An async driver running the state machine on one tokio task
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{NavigationContext, PlaybackOrchestrator, PlaybackService};
//!
//! let orchestrator = PlaybackOrchestrator::from_config(&config)?;
//! let handle = PlaybackService::spawn(orchestrator);
//!
//! handle.play_auto_mode(3, NavigationContext::new(18, verses)).await?;
//! let mut state = handle.subscribe_state();
//! state.changed().await?;
//! ```

pub mod device;
pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod reciters;
pub mod resolver;
pub mod sequencer;
pub mod service;
pub mod state;
pub mod verse;

pub use device::AdapterMessage;
pub use error::{PlaybackError, Result};
pub use observer::{EventBusObserver, PlaybackObserver};
pub use orchestrator::PlaybackOrchestrator;
pub use reciters::{Reciter, ReciterRegistry};
pub use resolver::{ResourceResolver, CHAPTER_COUNT};
pub use sequencer::{Advance, PendingAdvance};
pub use service::{PlaybackHandle, PlaybackService};
pub use state::{ActiveVerse, AudioState, PlaybackMode, PlaybackPhase};
pub use verse::{NavigationContext, Verse};
