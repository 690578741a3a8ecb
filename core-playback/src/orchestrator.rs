//! # Playback Orchestrator
//!
//! The verse playback state machine. One orchestrator exists per open
//! chapter view and exclusively owns:
//!
//! - the canonical [`AudioState`], published read-only through a
//!   `tokio::sync::watch` channel,
//! - the single live [`DeviceAdapter`],
//! - the navigation context cached for `next`/`previous` and auto mode,
//! - the pending auto-advance.
//!
//! The orchestrator itself performs no I/O and never sleeps. Device events
//! arrive on an internal queue drained by [`pump`](PlaybackOrchestrator::pump)
//! (or by the [`PlaybackService`](crate::PlaybackService) task), and the
//! inter-verse delay is armed as a [`PendingAdvance`] whose ticket the driver
//! hands back to [`fire_advance`](PlaybackOrchestrator::fire_advance) once
//! the delay has elapsed.
//!
//! ## Phases
//!
//! ```text
//! Idle ──play*──▶ Loading ──Started──▶ Playing ⇄ Paused
//!                    │                    │
//!                  Error               Ended ──(auto, next exists)──▶ Loading
//!                    │                    │
//!                    ▼                    ▼
//!                  Idle ◀─────────────── Idle (session complete)
//! ```
//!
//! `stop` and every `play*` call cancel whatever is in flight, including a
//! pending auto-advance.

use crate::device::{AdapterMessage, DeviceAdapter};
use crate::error::{PlaybackError, Result};
use crate::observer::PlaybackObserver;
use crate::reciters::ReciterRegistry;
use crate::resolver::ResourceResolver;
use crate::sequencer::{Advance, PendingAdvance, Sequencer};
use crate::state::{ActiveVerse, AudioState, PlaybackMode, PlaybackPhase};
use crate::verse::NavigationContext;
use bridge_traits::{AudioDevice, DeviceEvent, MediaRequest, PlaybackMetadata, PlaybackOptions};
use core_runtime::config::{CoreConfig, PlaybackSettings};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Verse playback state machine for one chapter view.
pub struct PlaybackOrchestrator {
    device: Arc<dyn AudioDevice>,
    registry: Arc<ReciterRegistry>,
    resolver: ResourceResolver,
    selected_reciter: String,
    inter_verse_delay: Duration,
    volume: f32,

    state: AudioState,
    phase: PlaybackPhase,
    adapter: Option<DeviceAdapter>,
    generation: u64,
    navigation: Option<NavigationContext>,
    sequencer: Sequencer,

    observers: Vec<Arc<dyn PlaybackObserver>>,
    state_tx: watch::Sender<AudioState>,
    events_tx: mpsc::UnboundedSender<AdapterMessage>,
    events_rx: mpsc::UnboundedReceiver<AdapterMessage>,
}

impl PlaybackOrchestrator {
    /// Creates an orchestrator for `device` with the given settings.
    ///
    /// Fails if the settings are invalid, the default reciter is not in the
    /// registry, the verse fallback reciter has no verse-level audio, or a
    /// registry entry disagrees with the resolver about verse-level audio.
    pub fn new(
        device: Arc<dyn AudioDevice>,
        registry: Arc<ReciterRegistry>,
        settings: &PlaybackSettings,
    ) -> Result<Self> {
        settings.validate()?;

        let resolver = ResourceResolver::new(settings.verse_fallback_reciter.clone())?;
        registry.require(resolver.verse_fallback())?;
        resolver.check_registry(&registry)?;

        let selected_reciter = match &settings.default_reciter {
            Some(id) => registry.require(id)?.id.clone(),
            None => registry.first().id.clone(),
        };

        let (state_tx, _) = watch::channel(AudioState::idle());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            device,
            registry,
            resolver,
            selected_reciter,
            inter_verse_delay: settings.inter_verse_delay(),
            volume: settings.initial_volume,
            state: AudioState::idle(),
            phase: PlaybackPhase::Idle,
            adapter: None,
            generation: 0,
            navigation: None,
            sequencer: Sequencer::default(),
            observers: Vec::new(),
            state_tx,
            events_tx,
            events_rx,
        })
    }

    /// Creates an orchestrator from a runtime configuration and the builtin
    /// reciter registry.
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        Self::new(
            config.audio_device.clone(),
            Arc::new(ReciterRegistry::builtin()),
            &config.settings,
        )
    }

    pub fn with_observer(mut self, observer: Arc<dyn PlaybackObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    // ========================================================================
    // Read-only accessors
    // ========================================================================

    pub fn state(&self) -> &AudioState {
        &self.state
    }

    /// Receiver that always holds the latest published state.
    pub fn subscribe_state(&self) -> watch::Receiver<AudioState> {
        self.state_tx.subscribe()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn navigation(&self) -> Option<&NavigationContext> {
        self.navigation.as_ref()
    }

    pub fn pending_advance(&self) -> Option<PendingAdvance> {
        self.sequencer.pending()
    }

    pub fn selected_reciter(&self) -> &str {
        &self.selected_reciter
    }

    pub fn registry(&self) -> &ReciterRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Whether a device adapter is currently alive.
    pub fn has_live_adapter(&self) -> bool {
        self.adapter.is_some()
    }

    // ========================================================================
    // Playback operations
    // ========================================================================

    /// Plays a single verse.
    ///
    /// Invoking it again for the verse that is already loaded toggles
    /// pause/resume instead of reloading. A supplied `context` refreshes the
    /// cached navigation context without changing the mode.
    ///
    /// The resource is `audio_url` if given, else the verse's own URL from the
    /// context, else the resolver's verse URL for the selected reciter.
    #[instrument(skip(self, audio_url, context))]
    pub fn play_verse(
        &mut self,
        verse: u32,
        audio_url: Option<String>,
        context: Option<NavigationContext>,
    ) -> Result<()> {
        let same_chapter = match (&context, self.state.chapter) {
            (Some(ctx), Some(chapter)) => ctx.chapter() == chapter,
            _ => true,
        };

        if let Some(ctx) = context {
            self.navigation = Some(ctx);
        }

        let is_loaded = self.state.current_verse == Some(ActiveVerse::Verse(verse))
            && same_chapter
            && matches!(
                self.phase,
                PlaybackPhase::Loading | PlaybackPhase::Playing | PlaybackPhase::Paused
            );
        if is_loaded {
            debug!(verse, "Verse already loaded, toggling");
            return self.toggle();
        }

        self.load_verse(PlaybackMode::SingleVerse, verse, audio_url)
    }

    /// Starts a fresh auto-sequential run at `start_verse`.
    ///
    /// Whatever is playing is torn down unconditionally. Fails without side
    /// effects if `start_verse` is not part of `context`.
    #[instrument(skip(self, context), fields(chapter = context.chapter(), verses = context.len()))]
    pub fn play_auto_mode(&mut self, start_verse: u32, context: NavigationContext) -> Result<()> {
        context.require(start_verse)?;
        self.navigation = Some(context);
        self.load_verse(PlaybackMode::AutoSequential, start_verse, None)
    }

    /// Plays the chapter-wide recording of the selected reciter.
    #[instrument(skip(self))]
    pub fn play_complete(&mut self, chapter: u16) -> Result<()> {
        let url = self
            .resolver
            .resolve_chapter_url(&self.selected_reciter, chapter);
        self.load(
            PlaybackMode::CompleteChapter,
            ActiveVerse::WholeChapter,
            Some(chapter),
            url,
        )
    }

    /// Pauses a loading or playing resource. No-op otherwise.
    #[instrument(skip(self))]
    pub fn pause(&mut self) -> Result<()> {
        if !matches!(self.phase, PlaybackPhase::Loading | PlaybackPhase::Playing) {
            debug!(phase = ?self.phase, "Pause ignored");
            return Ok(());
        }
        let Some(adapter) = self.adapter.as_mut() else {
            return Ok(());
        };

        adapter.pause()?;
        self.phase = PlaybackPhase::Paused;
        self.state.is_playing = false;
        self.state.is_paused = true;
        self.publish();
        Ok(())
    }

    /// Resumes a paused resource. No-op otherwise.
    #[instrument(skip(self))]
    pub fn resume(&mut self) -> Result<()> {
        if self.phase != PlaybackPhase::Paused {
            debug!(phase = ?self.phase, "Resume ignored");
            return Ok(());
        }
        let Some(adapter) = self.adapter.as_mut() else {
            return Ok(());
        };

        adapter.resume()?;
        self.phase = PlaybackPhase::Playing;
        self.state.is_playing = true;
        self.state.is_paused = false;
        self.publish();
        Ok(())
    }

    /// Pauses when playing, resumes when paused.
    pub fn toggle(&mut self) -> Result<()> {
        match self.phase {
            PlaybackPhase::Loading | PlaybackPhase::Playing => self.pause(),
            PlaybackPhase::Paused => self.resume(),
            _ => {
                debug!(phase = ?self.phase, "Toggle ignored");
                Ok(())
            }
        }
    }

    /// Returns to `Idle` from any state.
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        self.cancel_current();
        self.navigation = None;
        self.phase = PlaybackPhase::Idle;
        if self.state != AudioState::idle() {
            self.state = AudioState::idle();
            self.publish();
        }
    }

    /// Jumps to `progress_percent` of the known duration. No-op while the
    /// duration is unknown.
    #[instrument(skip(self))]
    pub fn seek(&mut self, progress_percent: f64) -> Result<()> {
        if !progress_percent.is_finite() {
            return Err(PlaybackError::InvalidProgress(progress_percent));
        }

        let duration = self.state.duration;
        let seekable = matches!(
            self.phase,
            PlaybackPhase::Loading | PlaybackPhase::Playing | PlaybackPhase::Paused
        );
        let Some(adapter) = self.adapter.as_mut().filter(|_| seekable && duration > 0.0) else {
            debug!(duration, "Seek ignored");
            return Ok(());
        };

        let target = duration * progress_percent.clamp(0.0, 100.0) / 100.0;
        adapter.seek(Duration::from_secs_f64(target))?;
        self.state.set_position(target, duration);
        self.publish();
        Ok(())
    }

    /// Loads the verse after the current one in the navigation context.
    ///
    /// Promotes a single-verse session to auto-sequential.
    #[instrument(skip(self))]
    pub fn next(&mut self) -> Result<()> {
        self.step(|ctx, verse| ctx.next_after(verse).map(|v| v.verse_number))
    }

    /// Loads the verse before the current one in the navigation context.
    ///
    /// Promotes a single-verse session to auto-sequential.
    #[instrument(skip(self))]
    pub fn previous(&mut self) -> Result<()> {
        self.step(|ctx, verse| ctx.previous_before(verse).map(|v| v.verse_number))
    }

    /// Selects the reciter used for future resolutions. Never interrupts the
    /// current playback.
    #[instrument(skip(self))]
    pub fn set_selected_reciter(&mut self, reciter_id: &str) -> Result<()> {
        let reciter = self.registry.require(reciter_id)?;
        if reciter.id == self.selected_reciter {
            return Ok(());
        }

        self.selected_reciter = reciter.id.clone();
        info!(reciter = %self.selected_reciter, "Reciter selected");
        for observer in &self.observers {
            observer.on_reciter_changed(&self.selected_reciter);
        }
        Ok(())
    }

    /// Sets the volume of the live session and of every future one.
    #[instrument(skip(self))]
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }

        self.volume = volume;
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.set_volume(volume)?;
        }
        Ok(())
    }

    // ========================================================================
    // Device events and timers
    // ========================================================================

    /// Handles every queued device event. Returns how many were taken off
    /// the queue, stale ones included.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.events_rx.try_recv() {
            self.handle_adapter_message(message);
            handled += 1;
        }
        handled
    }

    /// Waits for the next queued device event.
    pub(crate) async fn next_device_message(&mut self) -> Option<AdapterMessage> {
        self.events_rx.recv().await
    }

    /// Applies one device event. Events from a torn-down adapter are dropped.
    pub fn handle_adapter_message(&mut self, message: AdapterMessage) {
        let live = self.adapter.as_ref().map(DeviceAdapter::generation);
        if live != Some(message.generation) {
            debug!(
                generation = message.generation,
                live = ?live,
                kind = message.event.kind(),
                "Dropping stale device event"
            );
            return;
        }

        match message.event {
            DeviceEvent::Started => self.on_started(),
            DeviceEvent::MetadataLoaded { duration } => {
                self.state
                    .set_position(self.state.current_time, duration.as_secs_f64());
                self.publish();
            }
            DeviceEvent::TimeUpdate {
                current_time,
                duration,
            } => {
                let epoch = self.adapter.as_ref().map_or(0, DeviceAdapter::seek_epoch);
                if message.seek_epoch != epoch {
                    debug!(
                        tick_epoch = message.seek_epoch,
                        epoch, "Ignoring progress tick from before the last seek"
                    );
                    return;
                }
                self.on_time_update(current_time, duration)
            }
            DeviceEvent::Ended => self.on_ended(),
            DeviceEvent::Error { message } => {
                warn!(error = %message, "Playback device reported an error");
                self.fail(&message);
            }
        }
    }

    /// Performs the scheduled auto-advance identified by `ticket`. Stale
    /// tickets are ignored.
    #[instrument(skip(self))]
    pub fn fire_advance(&mut self, ticket: u64) -> Result<()> {
        let Some(verse) = self.sequencer.take(ticket) else {
            debug!("Ignoring stale auto-advance");
            return Ok(());
        };
        if self.state.current_mode != PlaybackMode::AutoSequential
            || self.phase != PlaybackPhase::Ended
        {
            debug!(mode = %self.state.current_mode, "Auto-advance no longer applicable");
            return Ok(());
        }

        self.load_verse(PlaybackMode::AutoSequential, verse, None)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn step(&mut self, pick: impl Fn(&NavigationContext, u32) -> Option<u32>) -> Result<()> {
        let Some(ActiveVerse::Verse(current)) = self.state.current_verse else {
            debug!("No verse-scoped playback to step from");
            return Ok(());
        };
        let Some(target) = self.navigation.as_ref().and_then(|ctx| pick(ctx, current)) else {
            debug!(verse = current, "No adjacent verse");
            return Ok(());
        };

        if self.state.current_mode == PlaybackMode::SingleVerse {
            debug!("Promoting single-verse session to auto-sequential");
        }
        self.load_verse(PlaybackMode::AutoSequential, target, None)
    }

    fn load_verse(&mut self, mode: PlaybackMode, verse: u32, audio_url: Option<String>) -> Result<()> {
        let chapter = self
            .navigation
            .as_ref()
            .map(NavigationContext::chapter)
            .or(self.state.chapter);
        let url = self.verse_url(verse, chapter, audio_url);
        self.load(mode, ActiveVerse::Verse(verse), chapter, url)
    }

    fn verse_url(&self, verse: u32, chapter: Option<u16>, audio_url: Option<String>) -> Result<String> {
        if let Some(url) = audio_url {
            return Ok(url);
        }
        if let Some(url) = self
            .navigation
            .as_ref()
            .and_then(|ctx| ctx.get(verse))
            .and_then(|v| v.audio_url.clone())
        {
            return Ok(url);
        }
        let chapter = chapter.ok_or(PlaybackError::MissingChapter(verse))?;
        self.resolver
            .resolve_verse_url(&self.selected_reciter, chapter, verse)
    }

    /// Cancels everything in flight and starts `url`.
    fn load(
        &mut self,
        mode: PlaybackMode,
        target: ActiveVerse,
        chapter: Option<u16>,
        url: Result<String>,
    ) -> Result<()> {
        self.cancel_current();

        let url = match url {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "Resource resolution failed");
                self.fail(&err.to_string());
                return Err(err);
            }
        };

        self.generation += 1;
        let request = MediaRequest::new(url.clone())
            .with_options(PlaybackOptions {
                initial_volume: self.volume,
                ..Default::default()
            })
            .with_metadata(PlaybackMetadata {
                chapter,
                verse: target.verse_number(),
                reciter_id: Some(self.selected_reciter.clone()),
                ..Default::default()
            });

        let opened = DeviceAdapter::open(
            self.device.as_ref(),
            request,
            self.generation,
            self.events_tx.clone(),
        )
        .and_then(|mut adapter| adapter.play().map(|()| adapter));

        match opened {
            Ok(adapter) => {
                info!(
                    mode = %mode,
                    verse = target.as_i32(),
                    generation = self.generation,
                    url = redact_url(adapter.url()),
                    "Loading resource"
                );
                self.adapter = Some(adapter);
                self.phase = PlaybackPhase::Loading;
                self.state = AudioState::loading(mode, target, chapter);
                self.publish();
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!(url = redact_url(&url), error = %message, "Failed to start playback");
                self.fail(&message);
                Err(PlaybackError::LoadFailed { url, message })
            }
        }
    }

    fn on_started(&mut self) {
        if self.phase != PlaybackPhase::Loading {
            debug!(phase = ?self.phase, "Ignoring start confirmation");
            return;
        }
        self.phase = PlaybackPhase::Playing;
        self.state.is_playing = true;
        self.state.is_paused = false;
        self.publish();
    }

    fn on_time_update(&mut self, current_time: Duration, duration: Option<Duration>) {
        let current_time = current_time.as_secs_f64();
        let duration = duration.map_or(self.state.duration, |d| d.as_secs_f64());
        if current_time < self.state.current_time {
            debug!(current_time, "Ignoring regressing progress tick");
            return;
        }

        self.state.set_position(current_time, duration);
        self.state_tx.send_replace(self.state.clone());
        for observer in &self.observers {
            observer.on_time_update(self.state.current_time, self.state.duration);
        }
    }

    fn on_ended(&mut self) {
        if !matches!(self.phase, PlaybackPhase::Loading | PlaybackPhase::Playing) {
            debug!(phase = ?self.phase, "Ignoring end of resource");
            return;
        }
        let Some(finished) = self.state.current_verse else {
            return;
        };
        let mode = self.state.current_mode;

        self.phase = PlaybackPhase::Ended;
        let duration = self.state.duration;
        if duration > 0.0 {
            self.state.set_position(duration, duration);
        }
        debug!(verse = finished.as_i32(), mode = %mode, "Resource ended");
        for observer in &self.observers {
            observer.on_verse_complete(finished);
        }

        let advance = match (mode, finished) {
            (PlaybackMode::AutoSequential, ActiveVerse::Verse(verse)) => self
                .sequencer
                .on_verse_ended(self.navigation.as_ref(), verse, self.inter_verse_delay),
            _ => Advance::Exhausted,
        };

        match advance {
            Advance::Scheduled(pending) => {
                debug!(next = pending.verse, ticket = pending.ticket, "Auto-advance scheduled");
                self.publish();
            }
            Advance::Exhausted => self.finish_session(mode),
        }
    }

    fn finish_session(&mut self, mode: PlaybackMode) {
        self.cancel_current();
        self.navigation = None;
        self.phase = PlaybackPhase::Idle;
        self.state = AudioState::idle();
        self.publish();
        info!(mode = %mode, "Playback session complete");
        for observer in &self.observers {
            observer.on_session_complete(mode);
        }
    }

    /// Reports a failure once and leaves the machine cleanly idle. No retry.
    fn fail(&mut self, message: &str) {
        self.phase = PlaybackPhase::Error;
        self.cancel_current();
        self.navigation = None;
        self.phase = PlaybackPhase::Idle;
        self.state = AudioState::idle();
        self.publish();
        for observer in &self.observers {
            observer.on_error(message);
        }
    }

    /// Drops the pending advance and tears the live adapter down.
    fn cancel_current(&mut self) {
        if let Some(pending) = self.sequencer.cancel() {
            debug!(ticket = pending.ticket, "Cancelled pending auto-advance");
        }
        if let Some(mut adapter) = self.adapter.take() {
            adapter.teardown();
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
        for observer in &self.observers {
            observer.on_state_changed(&self.state);
        }
    }
}

impl std::fmt::Debug for PlaybackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackOrchestrator")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("selected_reciter", &self.selected_reciter)
            .field("adapter", &self.adapter)
            .field("pending_advance", &self.sequencer.pending())
            .finish()
    }
}
