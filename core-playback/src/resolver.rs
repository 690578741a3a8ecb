//! # Resource Resolver
//!
//! Pure mapping from (reciter, chapter, verse) to a playable URL.
//!
//! Chapter-wide recordings are served per reciter from different hosts, so
//! each reciter has its own base URL with a generic fallback for unlisted
//! ids. Verse-level recordings follow the `CCCVVV.mp3` convention and exist
//! only for a subset of reciters; every other reciter resolves to the verse
//! fallback reciter's recording so that auto-sequential playback always
//! works.

use crate::error::{PlaybackError, Result};
use crate::reciters::ReciterRegistry;
use core_runtime::config::DEFAULT_VERSE_FALLBACK_RECITER;

/// Highest chapter number.
pub const CHAPTER_COUNT: u16 = 114;

/// Template used for reciters missing from [`CHAPTER_SOURCES`].
const GENERIC_CHAPTER_BASE: &str = "https://download.quranicaudio.com/quran";

/// Chapter-wide recording hosts, keyed by reciter id.
const CHAPTER_SOURCES: &[(&str, &str)] = &[
    ("alafasy", "https://server8.mp3quran.net/afs"),
    ("abdulbasit", "https://server7.mp3quran.net/basit"),
    ("sudais", "https://server11.mp3quran.net/sds"),
    ("husary", "https://server13.mp3quran.net/husr"),
    ("minshawi", "https://server10.mp3quran.net/minsh"),
    ("maher", "https://server12.mp3quran.net/maher"),
];

const VERSE_BASE: &str = "https://everyayah.com/data";

/// Verse-level recording folders. Reciters absent here have no per-verse
/// assets.
const VERSE_SOURCES: &[(&str, &str)] = &[
    ("alafasy", "Alafasy_128kbps"),
    ("abdulbasit", "Abdul_Basit_Murattal_192kbps"),
    ("sudais", "Abdurrahmaan_As-Sudais_192kbps"),
    ("husary", "Husary_128kbps"),
];

fn lookup<'a>(table: &'a [(&str, &str)], reciter_id: &str) -> Option<&'a str> {
    table
        .iter()
        .find(|(id, _)| *id == reciter_id)
        .map(|(_, value)| *value)
}

fn validate_chapter(chapter: u16) -> Result<()> {
    if chapter == 0 || chapter > CHAPTER_COUNT {
        return Err(PlaybackError::InvalidChapter(chapter));
    }
    Ok(())
}

/// Resolves reciter/chapter/verse triples into resource URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResolver {
    verse_fallback: String,
}

impl ResourceResolver {
    /// Creates a resolver whose verse-level fallback is `verse_fallback`.
    ///
    /// Fails if the fallback reciter has no verse-level assets itself.
    pub fn new(verse_fallback: impl Into<String>) -> Result<Self> {
        let verse_fallback = verse_fallback.into();
        if lookup(VERSE_SOURCES, &verse_fallback).is_none() {
            return Err(PlaybackError::Resolution(format!(
                "Verse fallback reciter '{}' has no verse-level recordings",
                verse_fallback
            )));
        }
        Ok(Self { verse_fallback })
    }

    /// Reciter whose recordings back verse playback for reciters without any.
    pub fn verse_fallback(&self) -> &str {
        &self.verse_fallback
    }

    /// Whether `reciter_id` has its own per-verse recordings.
    pub fn has_verse_audio(reciter_id: &str) -> bool {
        lookup(VERSE_SOURCES, reciter_id).is_some()
    }

    /// Checks that every reciter in `registry` advertises verse-level audio
    /// exactly when this resolver has recordings for it.
    pub fn check_registry(&self, registry: &ReciterRegistry) -> Result<()> {
        for reciter in registry.iter() {
            let known = Self::has_verse_audio(&reciter.id);
            if reciter.has_verse_audio != known {
                return Err(PlaybackError::Resolution(format!(
                    "Reciter '{}' declares verse-level audio {} but the resolver has {}",
                    reciter.id,
                    if reciter.has_verse_audio { "available" } else { "missing" },
                    if known { "recordings" } else { "none" },
                )));
            }
        }
        Ok(())
    }

    /// URL of the chapter-wide recording, e.g.
    /// `https://server8.mp3quran.net/afs/001.mp3`.
    pub fn resolve_chapter_url(&self, reciter_id: &str, chapter: u16) -> Result<String> {
        validate_chapter(chapter)?;

        let url = match lookup(CHAPTER_SOURCES, reciter_id) {
            Some(base) => format!("{}/{:03}.mp3", base, chapter),
            None => format!("{}/{}/{:03}.mp3", GENERIC_CHAPTER_BASE, reciter_id, chapter),
        };
        Ok(url)
    }

    /// URL of a single verse recording, e.g.
    /// `https://everyayah.com/data/Alafasy_128kbps/001001.mp3`.
    ///
    /// Reciters without verse-level recordings resolve to the fallback
    /// reciter's URL; the result then does not reflect `reciter_id`.
    pub fn resolve_verse_url(&self, reciter_id: &str, chapter: u16, verse: u32) -> Result<String> {
        validate_chapter(chapter)?;
        if verse == 0 {
            return Err(PlaybackError::InvalidVerse(verse));
        }

        let folder = lookup(VERSE_SOURCES, reciter_id)
            .or_else(|| lookup(VERSE_SOURCES, &self.verse_fallback))
            .ok_or_else(|| {
                PlaybackError::Resolution(format!(
                    "No verse-level recordings for '{}' or fallback '{}'",
                    reciter_id, self.verse_fallback
                ))
            })?;

        Ok(format!("{}/{}/{:03}{:03}.mp3", VERSE_BASE, folder, chapter, verse))
    }
}

impl Default for ResourceResolver {
    fn default() -> Self {
        Self {
            verse_fallback: DEFAULT_VERSE_FALLBACK_RECITER.to_string(),
        }
    }
}
