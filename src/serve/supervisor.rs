// src/serve/supervisor.rs

//! Dev-server process supervision.
//!
//! One child at a time. A restart request kills the running child, waits for
//! it, and launches a fresh one. Any exit we didn't cause is a crash and ends
//! supervision; there is no retry.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use anyhow::Context;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::{BuildMode, ServeSettings};
use crate::errors::{PipelineError, Result};
use crate::serve::events::ServeEvent;
use crate::serve::readiness::{Readiness, monitor_output};

#[derive(Debug)]
pub struct Supervisor {
    settings: ServeSettings,
    root: PathBuf,
    mode: BuildMode,
    readiness: Readiness,
    events: mpsc::Sender<ServeEvent>,
    restarts: mpsc::Receiver<PathBuf>,
}

impl Supervisor {
    /// `restarts` carries the file that caused each restart; closing it
    /// stops the server and ends [`run`](Self::run) successfully.
    pub fn new(
        settings: ServeSettings,
        root: impl Into<PathBuf>,
        mode: BuildMode,
        events: mpsc::Sender<ServeEvent>,
        restarts: mpsc::Receiver<PathBuf>,
    ) -> Result<Self> {
        let readiness = Readiness::from_settings(&settings)?;
        Ok(Self {
            settings,
            root: root.into(),
            mode,
            readiness,
            events,
            restarts,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        let mut child = self.launch()?;
        if let Some(status) = self.wait_ready(&mut child).await {
            return self.crashed(status).await;
        }
        self.emit(ServeEvent::Started).await;

        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status.context("waiting for server process")?;
                    return self.crashed(status).await;
                }
                changed = self.restarts.recv() => {
                    let Some(changed) = changed else {
                        info!("stopping server");
                        stop(&mut child).await;
                        return Ok(());
                    };

                    info!(changed = ?changed, "restarting server");
                    stop(&mut child).await;
                    child = self.launch()?;
                    if let Some(status) = self.wait_ready(&mut child).await {
                        return self.crashed(status).await;
                    }
                    self.emit(ServeEvent::Restarted { changed }).await;
                }
            }
        }
    }

    fn launch(&self) -> Result<Child> {
        info!(cmd = %self.settings.cmd, mode = %self.mode, "starting server");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.settings.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.settings.cmd);
            c
        };

        cmd.current_dir(&self.root)
            .env(&self.settings.env_var, self.mode.as_env_value())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning server `{}`", self.settings.cmd))?;
        Ok(child)
    }

    /// `None` once ready, or the exit status if the child died first.
    async fn wait_ready(&self, child: &mut Child) -> Option<ExitStatus> {
        let signal = monitor_output(child.stdout.take(), child.stderr.take(), &self.readiness);
        tokio::select! {
            _ = signal.wait() => None,
            status = child.wait() => match status {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!("failed to wait on server process: {e}");
                    None
                }
            },
        }
    }

    async fn crashed(&self, status: ExitStatus) -> Result<()> {
        let code = status.code();
        error!(?code, "server exited unexpectedly");
        self.emit(ServeEvent::Crashed { code }).await;
        Err(PipelineError::ServerCrashed { code })
    }

    async fn emit(&self, event: ServeEvent) {
        if self.events.send(event).await.is_err() {
            warn!("serve event receiver dropped");
        }
    }
}

async fn stop(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!("failed to stop server process: {e}");
    }
}
