//! Workspace entry crate.
//!
//! Host applications depend on `tilawa-workspace` and get the service façade
//! (`CoreService`) plus the playback and configuration types it exposes,
//! without wiring each workspace crate individually.

pub use core_service::*;
