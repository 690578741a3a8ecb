//! Verse content and the navigation context cached for sequential playback.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// One verse as supplied by the content provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    pub text: String,
    /// 1-based number, unique within its chapter.
    pub verse_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transliteration: Option<String>,
    pub translation: String,
    /// Ready-made recording URL. When absent the resolver is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl Verse {
    pub fn new(verse_number: u32, text: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            verse_number,
            transliteration: None,
            translation: translation.into(),
            audio_url: None,
        }
    }

    pub fn with_transliteration(mut self, transliteration: impl Into<String>) -> Self {
        self.transliteration = Some(transliteration.into());
        self
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }
}

/// Ordered verse list of the open chapter.
///
/// The list may have gaps or be an arbitrary subset (a favourites playlist),
/// so adjacency is always by position, never by verse number arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationContext {
    chapter: u16,
    verses: Vec<Verse>,
}

impl NavigationContext {
    pub fn new(chapter: u16, verses: Vec<Verse>) -> Self {
        Self { chapter, verses }
    }

    pub fn chapter(&self) -> u16 {
        self.chapter
    }

    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    /// Position of `verse_number` in the list.
    pub fn position_of(&self, verse_number: u32) -> Option<usize> {
        self.verses
            .iter()
            .position(|v| v.verse_number == verse_number)
    }

    pub fn get(&self, verse_number: u32) -> Option<&Verse> {
        self.position_of(verse_number).map(|i| &self.verses[i])
    }

    /// Like [`get`](Self::get) but fails with
    /// [`PlaybackError::VerseNotInContext`].
    pub fn require(&self, verse_number: u32) -> Result<&Verse> {
        self.get(verse_number)
            .ok_or(PlaybackError::VerseNotInContext {
                chapter: self.chapter,
                verse: verse_number,
            })
    }

    /// Verse immediately after `verse_number` in list order.
    pub fn next_after(&self, verse_number: u32) -> Option<&Verse> {
        let position = self.position_of(verse_number)?;
        self.verses.get(position + 1)
    }

    /// Verse immediately before `verse_number` in list order.
    pub fn previous_before(&self, verse_number: u32) -> Option<&Verse> {
        let position = self.position_of(verse_number)?;
        position.checked_sub(1).and_then(|p| self.verses.get(p))
    }
}
