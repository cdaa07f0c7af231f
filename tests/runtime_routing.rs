// tests/runtime_routing.rs

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use assetpipe::engine::{CoreRuntime, Runtime, RuntimeEvent, WatchTarget};
use assetpipe::serve::{LiveReloadHub, PushKind, ReloadMessage, ServeEvent};
use assetpipe::tasks::{BuildStep, StepRunner};
use assetpipe_test_utils::{RecordingRunner, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn changed(target: WatchTarget, path: &str) -> RuntimeEvent {
    RuntimeEvent::FileChanged {
        target,
        path: path.to_string(),
    }
}

async fn wait_for_started(runner: &RecordingRunner, count: usize) {
    while runner.started().len() < count {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn style_change_rebuilds_and_pushes_without_restart() -> TestResult {
    init_tracing();

    let runner = RecordingRunner::new();
    let shared: Arc<dyn StepRunner> = Arc::new(runner.clone());
    let hub = LiveReloadHub::new();
    let mut browser = hub.subscribe();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let (restart_tx, mut restart_rx) = mpsc::channel::<PathBuf>(4);
    let (serve_tx, mut serve_rx) = mpsc::channel::<ServeEvent>(4);

    let runtime = Runtime::new(CoreRuntime::new("dist"), rt_rx, rt_tx.clone(), shared)
        .with_server_restarts(restart_tx)
        .with_live_reload(hub.clone(), serve_tx);
    let handle = tokio::spawn(runtime.run());

    rt_tx
        .send(changed(WatchTarget::Rebuild(BuildStep::Styles), "src/styles/a.scss"))
        .await?;
    with_timeout(wait_for_started(&runner, 1)).await;

    rt_tx
        .send(changed(WatchTarget::PushAsset, "dist/styles/main.css"))
        .await?;
    let pushed = with_timeout(serve_rx.recv()).await;
    assert_eq!(
        pushed,
        Some(ServeEvent::AssetPushed {
            path: "/styles/main.css".into(),
            kind: PushKind::Inject,
        })
    );
    assert_eq!(
        browser.recv().await?,
        ReloadMessage::Inject {
            path: "/styles/main.css".into()
        }
    );

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;

    assert_eq!(runner.started(), vec![BuildStep::Styles]);
    assert!(restart_rx.try_recv().is_err(), "no restart for a style change");
    Ok(())
}

#[tokio::test]
async fn app_change_is_forwarded_to_the_supervisor() -> TestResult {
    init_tracing();

    let runner = RecordingRunner::new();
    let shared: Arc<dyn StepRunner> = Arc::new(runner.clone());
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let (restart_tx, mut restart_rx) = mpsc::channel::<PathBuf>(4);

    let runtime = Runtime::new(CoreRuntime::new("dist"), rt_rx, rt_tx.clone(), shared)
        .with_server_restarts(restart_tx);
    let handle = tokio::spawn(runtime.run());

    rt_tx
        .send(changed(WatchTarget::RestartServer, "server/app.js"))
        .await?;
    let restart = with_timeout(restart_rx.recv()).await;
    assert_eq!(restart, Some(PathBuf::from("server/app.js")));

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;
    assert!(runner.started().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_rebuild_keeps_watching() -> TestResult {
    init_tracing();

    let runner = RecordingRunner::new().failing(BuildStep::Scripts);
    let shared: Arc<dyn StepRunner> = Arc::new(runner.clone());
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);

    let runtime = Runtime::new(CoreRuntime::new("dist"), rt_rx, rt_tx.clone(), shared);
    let handle = tokio::spawn(runtime.run());

    rt_tx
        .send(changed(WatchTarget::Rebuild(BuildStep::Scripts), "src/scripts/a.js"))
        .await?;
    with_timeout(wait_for_started(&runner, 1)).await;
    rt_tx
        .send(changed(WatchTarget::Rebuild(BuildStep::Scripts), "src/scripts/a.js"))
        .await?;
    with_timeout(wait_for_started(&runner, 2)).await;

    assert!(!handle.is_finished());
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;
    Ok(())
}
