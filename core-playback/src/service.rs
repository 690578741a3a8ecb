//! # Playback Service
//!
//! Runs a [`PlaybackOrchestrator`] on a single tokio task. The task
//! multiplexes three inputs with `tokio::select!`:
//!
//! 1. commands from any number of [`PlaybackHandle`]s,
//! 2. device events queued by the live adapter,
//! 3. the inter-verse timer of a pending auto-advance.
//!
//! Commands are preferred over device events and timers, so an explicit
//! `stop` that is already queued always beats a scheduled verse load.
//! Each handle method resolves once the command has been applied, which
//! makes cancellation synchronous from the caller's point of view.
//!
//! Dropping every handle shuts the task down and tears the live adapter
//! down with it, but only once the task next runs. A view that must release
//! the device before it goes away awaits [`PlaybackHandle::close`] instead.

use crate::error::{PlaybackError, Result};
use crate::orchestrator::PlaybackOrchestrator;
use crate::state::{AudioState, PlaybackPhase};
use crate::verse::NavigationContext;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    PlayVerse {
        verse: u32,
        audio_url: Option<String>,
        context: Option<NavigationContext>,
        reply: Reply<()>,
    },
    PlayAutoMode {
        start_verse: u32,
        context: NavigationContext,
        reply: Reply<()>,
    },
    PlayComplete {
        chapter: u16,
        reply: Reply<()>,
    },
    Pause(Reply<()>),
    Resume(Reply<()>),
    Toggle(Reply<()>),
    Stop(Reply<()>),
    Seek {
        progress_percent: f64,
        reply: Reply<()>,
    },
    Next(Reply<()>),
    Previous(Reply<()>),
    SelectReciter {
        reciter_id: String,
        reply: Reply<()>,
    },
    SetVolume {
        volume: f32,
        reply: Reply<()>,
    },
    Phase(Reply<PlaybackPhase>),
    SelectedReciter(Reply<String>),
}

impl Command {
    fn apply(self, orchestrator: &mut PlaybackOrchestrator) {
        // A dropped reply receiver means the caller stopped waiting; the
        // command has still been applied.
        match self {
            Command::PlayVerse {
                verse,
                audio_url,
                context,
                reply,
            } => {
                let _ = reply.send(orchestrator.play_verse(verse, audio_url, context));
            }
            Command::PlayAutoMode {
                start_verse,
                context,
                reply,
            } => {
                let _ = reply.send(orchestrator.play_auto_mode(start_verse, context));
            }
            Command::PlayComplete { chapter, reply } => {
                let _ = reply.send(orchestrator.play_complete(chapter));
            }
            Command::Pause(reply) => {
                let _ = reply.send(orchestrator.pause());
            }
            Command::Resume(reply) => {
                let _ = reply.send(orchestrator.resume());
            }
            Command::Toggle(reply) => {
                let _ = reply.send(orchestrator.toggle());
            }
            Command::Stop(reply) => {
                orchestrator.stop();
                let _ = reply.send(Ok(()));
            }
            Command::Seek {
                progress_percent,
                reply,
            } => {
                let _ = reply.send(orchestrator.seek(progress_percent));
            }
            Command::Next(reply) => {
                let _ = reply.send(orchestrator.next());
            }
            Command::Previous(reply) => {
                let _ = reply.send(orchestrator.previous());
            }
            Command::SelectReciter { reciter_id, reply } => {
                let _ = reply.send(orchestrator.set_selected_reciter(&reciter_id));
            }
            Command::SetVolume { volume, reply } => {
                let _ = reply.send(orchestrator.set_volume(volume));
            }
            Command::Phase(reply) => {
                let _ = reply.send(Ok(orchestrator.phase()));
            }
            Command::SelectedReciter(reply) => {
                let _ = reply.send(Ok(orchestrator.selected_reciter().to_string()));
            }
        }
    }
}

/// Spawns orchestrators onto the tokio runtime.
pub struct PlaybackService;

impl PlaybackService {
    /// Moves `orchestrator` onto its own task and returns a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(orchestrator: PlaybackOrchestrator) -> PlaybackHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let state = orchestrator.subscribe_state();
        let task = tokio::spawn(run(orchestrator, commands_rx));

        PlaybackHandle {
            commands: commands_tx,
            state,
            task: std::sync::Arc::new(task),
        }
    }
}

async fn run(mut orchestrator: PlaybackOrchestrator, mut commands: mpsc::Receiver<Command>) {
    debug!("Playback service started");
    let mut timer: Option<(u64, Instant)> = None;

    loop {
        timer = match (orchestrator.pending_advance(), timer) {
            (Some(pending), Some((ticket, at))) if ticket == pending.ticket => Some((ticket, at)),
            (Some(pending), _) => Some((pending.ticket, Instant::now() + pending.delay)),
            (None, _) => None,
        };

        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(command) => command.apply(&mut orchestrator),
                None => break,
            },
            Some(message) = orchestrator.next_device_message() => {
                orchestrator.handle_adapter_message(message);
            }
            ticket = wait_for(timer) => {
                timer = None;
                // Load failures are reported through the observers.
                let _ = orchestrator.fire_advance(ticket);
            }
        }
    }

    orchestrator.stop();
    info!("Playback service stopped");
}

/// Resolves with the ticket once its deadline passes; never resolves without
/// a timer.
async fn wait_for(timer: Option<(u64, Instant)>) -> u64 {
    match timer {
        Some((ticket, at)) => {
            sleep_until(at).await;
            ticket
        }
        None => std::future::pending().await,
    }
}

/// Cloneable command handle to a running [`PlaybackService`].
///
/// Dropping the last handle stops the service asynchronously. Call
/// [`close`](Self::close) to have the live session torn down before the
/// handle is gone.
#[derive(Clone)]
pub struct PlaybackHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<AudioState>,
    task: std::sync::Arc<JoinHandle<()>>,
}

impl PlaybackHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| PlaybackError::ServiceClosed)?;
        response.await.map_err(|_| PlaybackError::ServiceClosed)?
    }

    /// See [`PlaybackOrchestrator::play_verse`].
    pub async fn play_verse(
        &self,
        verse: u32,
        audio_url: Option<String>,
        context: Option<NavigationContext>,
    ) -> Result<()> {
        self.request(|reply| Command::PlayVerse {
            verse,
            audio_url,
            context,
            reply,
        })
        .await
    }

    /// See [`PlaybackOrchestrator::play_auto_mode`].
    pub async fn play_auto_mode(&self, start_verse: u32, context: NavigationContext) -> Result<()> {
        self.request(|reply| Command::PlayAutoMode {
            start_verse,
            context,
            reply,
        })
        .await
    }

    pub async fn play_complete(&self, chapter: u16) -> Result<()> {
        self.request(|reply| Command::PlayComplete { chapter, reply })
            .await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(Command::Resume).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.request(Command::Toggle).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    pub async fn seek(&self, progress_percent: f64) -> Result<()> {
        self.request(|reply| Command::Seek {
            progress_percent,
            reply,
        })
        .await
    }

    pub async fn next(&self) -> Result<()> {
        self.request(Command::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.request(Command::Previous).await
    }

    pub async fn set_selected_reciter(&self, reciter_id: impl Into<String>) -> Result<()> {
        let reciter_id = reciter_id.into();
        self.request(|reply| Command::SelectReciter { reciter_id, reply })
            .await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.request(|reply| Command::SetVolume { volume, reply })
            .await
    }

    pub async fn phase(&self) -> Result<PlaybackPhase> {
        self.request(Command::Phase).await
    }

    pub async fn selected_reciter(&self) -> Result<String> {
        self.request(Command::SelectedReciter).await
    }

    /// Stops playback, waits until the live session has been torn down and
    /// releases this handle. The service task ends once no other handle
    /// remains.
    pub async fn close(self) -> Result<()> {
        self.stop().await
    }

    /// Latest published state.
    pub fn state(&self) -> AudioState {
        self.state.borrow().clone()
    }

    /// Independent receiver of state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<AudioState> {
        self.state.clone()
    }

    /// Whether the background task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("running", &self.is_running())
            .finish()
    }
}
