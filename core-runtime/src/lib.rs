//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the playback core:
//! - Configuration (`CoreConfig` builder, JSON-loadable `PlaybackSettings`)
//! - Event bus for broadcasting playback notifications to UI surfaces
//! - Logging and tracing bootstrap

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
