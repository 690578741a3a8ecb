//! Core service façade and bootstrap helpers.
//!
//! This crate wires a host's [`CoreConfig`] (audio device, optional log sink,
//! playback settings) into the shared playback core. Every open chapter view
//! gets its own orchestrator running on its own task; all views publish onto
//! one shared event bus.
//!
//! ```ignore
//! use core_service::CoreService;
//!
//! let core = CoreService::new(config)?;
//! let mut events = core.subscribe_events();
//!
//! let view = core.open_chapter_view()?;
//! view.play_complete(18).await?;
//! // ...
//! view.close().await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_playback::{
    ActiveVerse, AudioState, NavigationContext, PlaybackHandle, PlaybackMode, PlaybackObserver,
    Reciter, ReciterRegistry, Verse,
};
pub use core_runtime::config::{CoreConfig, PlaybackSettings};
pub use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent, ReciterEvent};

use core_playback::{
    EventBusObserver, PlaybackOrchestrator, PlaybackService, ResourceResolver,
};
use core_runtime::logging::{init_logging, LoggingConfig};
use std::sync::Arc;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    registry: Arc<ReciterRegistry>,
    event_bus: EventBus,
}

impl CoreService {
    /// Create a service backed by the builtin reciter registry.
    pub fn new(config: CoreConfig) -> Result<Self> {
        Self::with_registry(config, ReciterRegistry::builtin())
    }

    /// Create a service with a host-supplied reciter registry.
    ///
    /// Reciter ids in the settings are checked against `registry` here, so
    /// opening a chapter view cannot fail on configuration.
    pub fn with_registry(config: CoreConfig, registry: ReciterRegistry) -> Result<Self> {
        config.validate()?;

        let settings = &config.settings;
        let resolver = ResourceResolver::new(settings.verse_fallback_reciter.clone())?;
        registry.require(resolver.verse_fallback())?;
        if let Some(id) = &settings.default_reciter {
            registry.require(id)?;
        }

        let event_bus = EventBus::new(settings.event_buffer_size);
        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            event_bus,
        })
    }

    /// Access the configuration in use.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn reciters(&self) -> &ReciterRegistry {
        &self.registry
    }

    /// Shared bus every chapter view publishes onto.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Opens an independent playback orchestrator for one chapter view.
    ///
    /// Must be called from within a tokio runtime. Dropping every clone of
    /// the returned handle closes the view and tears its audio down on the
    /// service task's next turn; await [`PlaybackHandle::close`] when the view
    /// unmounts to release the session before returning.
    pub fn open_chapter_view(&self) -> Result<PlaybackHandle> {
        self.open_chapter_view_with(Vec::new())
    }

    /// Like [`open_chapter_view`](Self::open_chapter_view), with additional
    /// in-process observers.
    pub fn open_chapter_view_with(
        &self,
        observers: Vec<Arc<dyn PlaybackObserver>>,
    ) -> Result<PlaybackHandle> {
        let mut orchestrator = PlaybackOrchestrator::new(
            self.config.audio_device.clone(),
            self.registry.clone(),
            &self.config.settings,
        )?
        .with_observer(Arc::new(EventBusObserver::new(self.event_bus.clone())));
        for observer in observers {
            orchestrator.add_observer(observer);
        }

        info!(reciter = orchestrator.selected_reciter(), "Chapter view opened");
        Ok(PlaybackService::spawn(orchestrator))
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("config", &self.config)
            .field("reciters", &self.registry.len())
            .finish()
    }
}

/// Installs logging (mirroring into the configured log sink, if any) and
/// builds the service.
pub fn bootstrap(config: CoreConfig, logging: LoggingConfig) -> Result<CoreService> {
    let logging = match (&config.logger_sink, logging.logger_sink.is_none()) {
        (Some(sink), true) => logging.with_logger_sink(sink.clone()),
        _ => logging,
    };
    init_logging(logging).map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    CoreService::new(config)
}
