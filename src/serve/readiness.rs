// src/serve/readiness.rs

//! Deciding when a freshly spawned server counts as started.

use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::ServeSettings;
use crate::errors::{PipelineError, Result};

#[derive(Debug, Clone)]
pub enum Readiness {
    /// Started as soon as the process is spawned.
    Immediate,
    /// Started on the first stdout line matching the pattern.
    StdoutPattern(Regex),
    /// Started after a fixed delay.
    After(Duration),
}

impl Readiness {
    /// `ready_pattern` wins over `ready_after`.
    pub fn from_settings(settings: &ServeSettings) -> Result<Self> {
        if let Some(pattern) = &settings.ready_pattern {
            let regex = Regex::new(pattern).map_err(|e| {
                PipelineError::ConfigError(format!("[serve].ready_pattern: {e}"))
            })?;
            return Ok(Readiness::StdoutPattern(regex));
        }
        Ok(match settings.ready_after {
            Some(delay) => Readiness::After(delay),
            None => Readiness::Immediate,
        })
    }
}

/// Resolves once the server is ready.
#[derive(Debug)]
pub struct ReadySignal {
    kind: SignalKind,
}

#[derive(Debug)]
enum SignalKind {
    Now,
    Delay(Duration),
    Line(oneshot::Receiver<()>),
}

impl ReadySignal {
    /// Never resolves if the output closes without a matching line; callers
    /// race it against process exit.
    pub async fn wait(self) {
        match self.kind {
            SignalKind::Now => {}
            SignalKind::Delay(delay) => sleep(delay).await,
            SignalKind::Line(rx) => {
                if rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

/// Forward a server's output to the log and arm its readiness signal.
///
/// Both streams are drained until they close so the child never blocks on
/// a full pipe.
pub fn monitor_output<O, E>(stdout: Option<O>, stderr: Option<E>, readiness: &Readiness) -> ReadySignal
where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    let (pattern, kind) = match readiness {
        Readiness::Immediate => (None, SignalKind::Now),
        Readiness::After(delay) => (None, SignalKind::Delay(*delay)),
        Readiness::StdoutPattern(regex) => {
            let (tx, rx) = oneshot::channel();
            (Some((regex.clone(), tx)), SignalKind::Line(rx))
        }
    };

    if let Some(stdout) = stdout {
        tokio::spawn(async move {
            let mut pattern = pattern;
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(target: "assetpipe::server", "{line}");
                let matched = pattern.as_ref().is_some_and(|(re, _)| re.is_match(&line));
                if matched && let Some((_, tx)) = pattern.take() {
                    debug!("server output matched ready_pattern");
                    let _ = tx.send(());
                }
            }
            debug!("server stdout closed");
        });
    }

    if let Some(stderr) = stderr {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(target: "assetpipe::server", "stderr: {line}");
            }
        });
    }

    ReadySignal { kind }
}
