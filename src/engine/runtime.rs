// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::serve::events::{PushKind, ServeEvent};
use crate::serve::livereload::{LiveReloadHub, ReloadMessage};
use crate::tasks::{BuildStep, StepRunner};

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, StepOutcome};

/// Async shell around [`CoreRuntime`].
///
/// Reads events, feeds them to the core and executes the resulting
/// commands. Steps are spawned onto the Tokio runtime and report back through
/// `event_tx`; nothing serializes two runs of the same step.
pub struct Runtime {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    runner: Arc<dyn StepRunner>,
    restarts: Option<mpsc::Sender<PathBuf>>,
    live_reload: Option<(LiveReloadHub, mpsc::Sender<ServeEvent>)>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        runner: Arc<dyn StepRunner>,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            runner,
            restarts: None,
            live_reload: None,
        }
    }

    /// Forward restart requests to the server supervisor.
    pub fn with_server_restarts(mut self, restarts: mpsc::Sender<PathBuf>) -> Self {
        self.restarts = Some(restarts);
        self
    }

    /// Push output changes to browsers and report them as serve events.
    pub fn with_live_reload(mut self, hub: LiveReloadHub, events: mpsc::Sender<ServeEvent>) -> Self {
        self.live_reload = Some((hub, events));
        self
    }

    /// Main event loop. Returns when shutdown is requested or every event
    /// sender is gone.
    pub async fn run(mut self) -> Result<()> {
        info!("watching for changes");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };
            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await;
            }

            if !step.keep_running {
                info!("shutdown requested; stopping runtime");
                break;
            }
        }

        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::RunStep(step) => self.spawn_step(step),
            CoreCommand::RestartServer(path) => match &self.restarts {
                Some(restarts) => {
                    if restarts.send(path).await.is_err() {
                        warn!("server supervisor is gone; restart dropped");
                    }
                }
                None => debug!(?path, "no server to restart"),
            },
            CoreCommand::PushAsset(message) => self.push_asset(message).await,
        }
    }

    fn spawn_step(&self, step: BuildStep) {
        let runner = Arc::clone(&self.runner);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = match runner.run(step).await {
                Ok(_) => StepOutcome::Success,
                Err(err) => StepOutcome::Failed(err.to_string()),
            };
            let _ = tx.send(RuntimeEvent::StepCompleted { step, outcome }).await;
        });
    }

    async fn push_asset(&self, message: ReloadMessage) {
        let Some((hub, events)) = &self.live_reload else {
            return;
        };
        let kind = match message {
            ReloadMessage::Inject { .. } => PushKind::Inject,
            _ => PushKind::Reload,
        };
        let path = message.path().unwrap_or_default().to_string();
        let clients = hub.push(message);
        debug!(%path, clients, "pushed live-reload message");
        let _ = events.send(ServeEvent::AssetPushed { path, kind }).await;
    }
}
