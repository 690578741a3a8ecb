//! Sequential advance for auto mode.
//!
//! When a verse ends naturally the sequencer looks up the following verse
//! *by position* in the navigation context and arms a ticketed advance.
//! Cancelling clears the pending slot and every new schedule gets a fresh
//! ticket, so a timer that fires with an old ticket is simply ignored.

use crate::verse::NavigationContext;
use std::time::Duration;

/// A scheduled load of the next verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAdvance {
    /// Identifies this schedule; the driver hands it back to
    /// [`fire_advance`](crate::PlaybackOrchestrator::fire_advance).
    pub ticket: u64,
    /// Verse to load when the delay elapses.
    pub verse: u32,
    pub delay: Duration,
}

/// Result of a natural verse completion in auto mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Scheduled(PendingAdvance),
    /// No verse follows; the session is complete.
    Exhausted,
}

#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    last_ticket: u64,
    pending: Option<PendingAdvance>,
}

impl Sequencer {
    pub(crate) fn pending(&self) -> Option<PendingAdvance> {
        self.pending
    }

    /// Decides what follows `finished` and arms the advance if a verse exists.
    pub(crate) fn on_verse_ended(
        &mut self,
        context: Option<&NavigationContext>,
        finished: u32,
        delay: Duration,
    ) -> Advance {
        let next = context.and_then(|ctx| ctx.next_after(finished));
        match next {
            Some(verse) => {
                self.last_ticket += 1;
                let pending = PendingAdvance {
                    ticket: self.last_ticket,
                    verse: verse.verse_number,
                    delay,
                };
                self.pending = Some(pending);
                Advance::Scheduled(pending)
            }
            None => {
                self.pending = None;
                Advance::Exhausted
            }
        }
    }

    /// Drops the pending advance, if any.
    pub(crate) fn cancel(&mut self) -> Option<PendingAdvance> {
        self.pending.take()
    }

    /// Claims the pending advance if `ticket` is still current.
    pub(crate) fn take(&mut self, ticket: u64) -> Option<u32> {
        match self.pending {
            Some(pending) if pending.ticket == ticket => {
                self.pending = None;
                Some(pending.verse)
            }
            _ => None,
        }
    }
}
