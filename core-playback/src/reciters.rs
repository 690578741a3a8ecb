//! # Reciter Registry
//!
//! Fixed, ordered list of reciters available for playback. The registry is
//! immutable once built; selection lives on the orchestrator.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named source of recitation audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reciter {
    /// Stable identifier used by the resolver (`"alafasy"`).
    pub id: String,
    /// Name shown in the selection panel.
    pub display_name: String,
    /// Portrait asset reference for the selection panel.
    pub image_ref: String,
    /// Whether per-verse recordings exist for this reciter.
    pub has_verse_audio: bool,
}

impl Reciter {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        image_ref: impl Into<String>,
        has_verse_audio: bool,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            image_ref: image_ref.into(),
            has_verse_audio,
        }
    }
}

/// Ordered, immutable reciter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReciterRegistry {
    reciters: Vec<Reciter>,
}

impl ReciterRegistry {
    /// Builds a registry, rejecting empty lists and duplicate ids.
    pub fn new(reciters: Vec<Reciter>) -> Result<Self> {
        if reciters.is_empty() {
            return Err(PlaybackError::Config(core_runtime::Error::Config(
                "Reciter registry cannot be empty".to_string(),
            )));
        }

        let mut seen = HashSet::new();
        for reciter in &reciters {
            if reciter.id.trim().is_empty() {
                return Err(PlaybackError::Config(core_runtime::Error::Config(
                    "Reciter id cannot be empty".to_string(),
                )));
            }
            if !seen.insert(reciter.id.as_str()) {
                return Err(PlaybackError::Config(core_runtime::Error::Config(format!(
                    "Duplicate reciter id: {}",
                    reciter.id
                ))));
            }
        }

        Ok(Self { reciters })
    }

    /// The reciters shipped with the application, in display order.
    pub fn builtin() -> Self {
        Self {
            reciters: vec![
                Reciter::new("alafasy", "Mishary Rashid Alafasy", "reciters/alafasy.jpg", true),
                Reciter::new(
                    "abdulbasit",
                    "Abdul Basit Abdul Samad",
                    "reciters/abdulbasit.jpg",
                    true,
                ),
                Reciter::new("sudais", "Abdul Rahman Al-Sudais", "reciters/sudais.jpg", true),
                Reciter::new(
                    "husary",
                    "Mahmoud Khalil Al-Husary",
                    "reciters/husary.jpg",
                    true,
                ),
                Reciter::new(
                    "minshawi",
                    "Mohamed Siddiq El-Minshawi",
                    "reciters/minshawi.jpg",
                    false,
                ),
                Reciter::new("maher", "Maher Al Muaiqly", "reciters/maher.jpg", false),
            ],
        }
    }

    /// First entry; the default selection.
    pub fn first(&self) -> &Reciter {
        // Construction guarantees at least one entry.
        &self.reciters[0]
    }

    pub fn get(&self, id: &str) -> Option<&Reciter> {
        self.reciters.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Looks up a reciter, failing with [`PlaybackError::UnknownReciter`].
    pub fn require(&self, id: &str) -> Result<&Reciter> {
        self.get(id)
            .ok_or_else(|| PlaybackError::UnknownReciter(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reciter> {
        self.reciters.iter()
    }

    pub fn len(&self) -> usize {
        self.reciters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reciters.is_empty()
    }
}

impl Default for ReciterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
