// src/serve/session.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::BuildContext;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::errors::{PipelineError, Result};
use crate::serve::events::ServeEvent;
use crate::serve::livereload::LiveReloadHub;
use crate::serve::proxy;
use crate::serve::supervisor::Supervisor;
use crate::tasks::{ContextRunner, StepRunner, run_default};
use crate::watch::{build_registrations, shutdown_on_ctrl_c, spawn_watcher};

/// The `serve` task.
///
/// Builds once, starts the app server, and once it is up puts the
/// live-reload proxy in front of it and starts watching. Returns `Ok` on
/// Ctrl-C and `Err(ServerCrashed)` if the server dies on its own.
pub async fn run_serve(ctx: Arc<BuildContext>) -> Result<()> {
    let settings = ctx.config().serve.clone().ok_or_else(|| {
        PipelineError::ConfigError("the serve task needs a [serve] section".to_string())
    })?;

    run_default(Arc::clone(&ctx)).await?;

    let (serve_tx, mut serve_rx) = mpsc::channel::<ServeEvent>(64);
    let (restart_tx, restart_rx) = mpsc::channel::<PathBuf>(16);
    let supervisor = Supervisor::new(
        settings.clone(),
        ctx.root(),
        ctx.mode(),
        serve_tx.clone(),
        restart_rx,
    )?;
    let supervisor = tokio::spawn(supervisor.run());

    match serve_rx.recv().await {
        Some(ServeEvent::Started) => info!("server started"),
        other => {
            info!(?other, "server did not start");
            return supervisor.await.context("server supervisor panicked")?;
        }
    }

    let hub = LiveReloadHub::new();
    let listener = proxy::bind(settings.proxy_port).await?;
    let app = proxy::router(&settings.upstream, hub.clone())?;
    let proxy_task = tokio::spawn(proxy::serve_proxy(listener, app));

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let _watcher = spawn_watcher(ctx.root(), build_registrations(&ctx, true)?, rt_tx.clone())?;
    shutdown_on_ctrl_c(rt_tx.clone());

    let runner: Arc<dyn StepRunner> = Arc::new(ContextRunner::new(Arc::clone(&ctx)));
    let runtime = Runtime::new(CoreRuntime::new(ctx.output_rel()), rt_rx, rt_tx, runner)
        .with_server_restarts(restart_tx)
        .with_live_reload(hub, serve_tx);
    let mut runtime = tokio::spawn(runtime.run());

    loop {
        tokio::select! {
            event = serve_rx.recv() => match event {
                Some(ServeEvent::Crashed { code }) => {
                    error!(?code, "server crashed; ending serve session");
                    runtime.abort();
                    break;
                }
                Some(event) => log_event(&event),
                None => break,
            },
            finished = &mut runtime => {
                if let Err(e) = finished.context("watch runtime panicked")? {
                    error!("watch runtime failed: {e}");
                }
                break;
            }
        }
    }

    proxy_task.abort();
    // Dropping the runtime closed the restart channel, which stops the
    // server if it is still running.
    supervisor.await.context("server supervisor panicked")?
}

fn log_event(event: &ServeEvent) {
    match event {
        ServeEvent::Started => info!("server started"),
        ServeEvent::Restarted { changed } => info!(changed = ?changed, "server restarted"),
        ServeEvent::AssetPushed { path, kind } => info!(%path, ?kind, "pushed to browsers"),
        ServeEvent::Crashed { code } => error!(?code, "server crashed"),
    }
}
