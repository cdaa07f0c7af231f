// src/watch/mod.rs

//! File watching and change routing.
//!
//! Compiles each asset group's globs into a [`WatchRegistration`] and turns
//! filesystem events into [`RuntimeEvent`]s for the engine. It knows which
//! step or server action a path belongs to, nothing about how they run.

pub mod path_utils;
pub mod patterns;
pub mod watcher;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::BuildContext;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::errors::Result;
use crate::tasks::{ContextRunner, StepRunner};

pub use patterns::{WatchRegistration, build_registrations, route_change};
pub use watcher::{WatcherHandle, spawn_watcher};

/// The `watch` task: rebuild asset groups as their sources change, until
/// Ctrl-C.
pub async fn run_watch(ctx: Arc<BuildContext>) -> Result<()> {
    let registrations = build_registrations(&ctx, false)?;
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher = spawn_watcher(ctx.root(), registrations, tx.clone())?;
    shutdown_on_ctrl_c(tx.clone());

    let runner: Arc<dyn StepRunner> = Arc::new(ContextRunner::new(Arc::clone(&ctx)));
    let core = CoreRuntime::new(ctx.output_rel());
    info!(root = ?ctx.root(), "watch started; press Ctrl-C to stop");
    Runtime::new(core, rx, tx, runner).run().await
}

/// Send `ShutdownRequested` on Ctrl-C.
pub fn shutdown_on_ctrl_c(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            return;
        }
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}
