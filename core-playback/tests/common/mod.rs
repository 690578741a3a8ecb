//! Test doubles shared by the playback integration tests.

#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioDevice, BridgeError, DeviceEvent, DeviceEventSink, MediaRequest, MediaSession,
};
use core_playback::{
    ActiveVerse, AudioState, NavigationContext, PlaybackMode, PlaybackObserver,
    PlaybackOrchestrator, ReciterRegistry, Verse,
};
use core_runtime::config::PlaybackSettings;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fake audio device
// ============================================================================

/// Transport command received by a fake session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Play,
    Pause,
    Resume,
    Seek(Duration),
    SetVolume(f32),
}

/// Everything a fake session saw.
pub struct SessionRecord {
    pub request: MediaRequest,
    pub sink: Arc<dyn DeviceEventSink>,
    pub torn_down: AtomicBool,
    pub commands: Mutex<Vec<SessionCommand>>,
}

impl SessionRecord {
    pub fn is_live(&self) -> bool {
        !self.torn_down.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct DeviceState {
    sessions: Vec<Arc<SessionRecord>>,
    max_live: usize,
    fail_next_open: Option<String>,
    fail_next_play: Option<String>,
}

/// In-memory [`AudioDevice`] recording every session it provisions.
#[derive(Default)]
pub struct FakeDevice {
    state: Mutex<DeviceState>,
}

impl FakeDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of sessions ever opened.
    pub fn opened(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Number of sessions not torn down yet.
    pub fn live(&self) -> usize {
        self.state.lock().sessions.iter().filter(|s| s.is_live()).count()
    }

    /// Highest number of simultaneously live sessions observed at open time.
    pub fn max_live(&self) -> usize {
        self.state.lock().max_live
    }

    pub fn session(&self, index: usize) -> Arc<SessionRecord> {
        self.state.lock().sessions[index].clone()
    }

    pub fn latest(&self) -> Arc<SessionRecord> {
        self.state
            .lock()
            .sessions
            .last()
            .cloned()
            .expect("no session opened")
    }

    pub fn urls(&self) -> Vec<String> {
        self.state
            .lock()
            .sessions
            .iter()
            .map(|s| s.request.url.clone())
            .collect()
    }

    /// Emits on the session at `index`, torn down or not.
    pub fn emit(&self, index: usize, event: DeviceEvent) {
        let sink = self.session(index).sink.clone();
        sink.emit(event);
    }

    pub fn emit_latest(&self, event: DeviceEvent) {
        let sink = self.latest().sink.clone();
        sink.emit(event);
    }

    pub fn fail_next_open(&self, message: &str) {
        self.state.lock().fail_next_open = Some(message.to_string());
    }

    pub fn fail_next_play(&self, message: &str) {
        self.state.lock().fail_next_play = Some(message.to_string());
    }
}

struct FakeSession {
    record: Arc<SessionRecord>,
    fail_play: Option<String>,
}

impl MediaSession for FakeSession {
    fn play(&mut self) -> BridgeResult<()> {
        if let Some(message) = self.fail_play.take() {
            return Err(BridgeError::OperationFailed(message));
        }
        self.record.commands.lock().push(SessionCommand::Play);
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.record.commands.lock().push(SessionCommand::Pause);
        Ok(())
    }

    fn resume(&mut self) -> BridgeResult<()> {
        self.record.commands.lock().push(SessionCommand::Resume);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> BridgeResult<()> {
        self.record.commands.lock().push(SessionCommand::Seek(position));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> BridgeResult<()> {
        self.record.commands.lock().push(SessionCommand::SetVolume(volume));
        Ok(())
    }

    fn teardown(&mut self) {
        self.record.torn_down.store(true, Ordering::SeqCst);
    }
}

impl AudioDevice for FakeDevice {
    fn open(
        &self,
        request: MediaRequest,
        events: Arc<dyn DeviceEventSink>,
    ) -> BridgeResult<Box<dyn MediaSession>> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_next_open.take() {
            return Err(BridgeError::NotAvailable(message));
        }

        let record = Arc::new(SessionRecord {
            request,
            sink: events,
            torn_down: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
        });
        state.sessions.push(record.clone());

        let live = state.sessions.iter().filter(|s| s.is_live()).count();
        state.max_live = state.max_live.max(live);

        Ok(Box::new(FakeSession {
            record,
            fail_play: state.fail_next_play.take(),
        }))
    }
}

// ============================================================================
// Recording observer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    VerseComplete(ActiveVerse),
    SessionComplete(PlaybackMode),
    Error(String),
    TimeUpdate(f64, f64),
    ReciterChanged(String),
}

/// Observer recording callbacks (except state changes) in order, plus every
/// published state separately.
#[derive(Default)]
pub struct RecordingObserver {
    callbacks: Mutex<Vec<Callback>>,
    states: Mutex<Vec<AudioState>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn callbacks(&self) -> Vec<Callback> {
        self.callbacks.lock().clone()
    }

    pub fn states(&self) -> Vec<AudioState> {
        self.states.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.callbacks()
            .into_iter()
            .filter_map(|c| match c {
                Callback::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn completed_verses(&self) -> Vec<ActiveVerse> {
        self.callbacks()
            .into_iter()
            .filter_map(|c| match c {
                Callback::VerseComplete(verse) => Some(verse),
                _ => None,
            })
            .collect()
    }

    pub fn session_completions(&self) -> usize {
        self.callbacks()
            .iter()
            .filter(|c| matches!(c, Callback::SessionComplete(_)))
            .count()
    }
}

impl PlaybackObserver for RecordingObserver {
    fn on_verse_complete(&self, verse: ActiveVerse) {
        self.callbacks.lock().push(Callback::VerseComplete(verse));
    }

    fn on_session_complete(&self, mode: PlaybackMode) {
        self.callbacks.lock().push(Callback::SessionComplete(mode));
    }

    fn on_error(&self, message: &str) {
        self.callbacks.lock().push(Callback::Error(message.to_string()));
    }

    fn on_time_update(&self, current_time: f64, duration: f64) {
        self.callbacks
            .lock()
            .push(Callback::TimeUpdate(current_time, duration));
    }

    fn on_state_changed(&self, state: &AudioState) {
        self.states.lock().push(state.clone());
    }

    fn on_reciter_changed(&self, reciter_id: &str) {
        self.callbacks
            .lock()
            .push(Callback::ReciterChanged(reciter_id.to_string()));
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn verses(numbers: impl IntoIterator<Item = u32>) -> Vec<Verse> {
    numbers
        .into_iter()
        .map(|n| Verse::new(n, format!("verse {n}"), format!("translation {n}")))
        .collect()
}

pub fn context(chapter: u16, numbers: impl IntoIterator<Item = u32>) -> NavigationContext {
    NavigationContext::new(chapter, verses(numbers))
}

pub fn orchestrator(device: &Arc<FakeDevice>) -> PlaybackOrchestrator {
    orchestrator_with(device, &PlaybackSettings::default())
}

pub fn orchestrator_with(device: &Arc<FakeDevice>, settings: &PlaybackSettings) -> PlaybackOrchestrator {
    PlaybackOrchestrator::new(
        device.clone(),
        Arc::new(ReciterRegistry::builtin()),
        settings,
    )
    .expect("valid settings")
}

/// Confirms playback of the latest session and applies the event.
pub fn start_latest(orchestrator: &mut PlaybackOrchestrator, device: &FakeDevice) {
    device.emit_latest(DeviceEvent::Started);
    orchestrator.pump();
}

/// Ends the latest session naturally and applies the event.
pub fn end_latest(orchestrator: &mut PlaybackOrchestrator, device: &FakeDevice) {
    device.emit_latest(DeviceEvent::Ended);
    orchestrator.pump();
}

/// Fires the pending auto-advance, if any. Returns whether one was pending.
pub fn fire_pending(orchestrator: &mut PlaybackOrchestrator) -> bool {
    match orchestrator.pending_advance() {
        Some(pending) => {
            let _ = orchestrator.fire_advance(pending.ticket);
            true
        }
        None => false,
    }
}
