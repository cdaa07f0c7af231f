// tests/plan_recording_runner.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use assetpipe::errors::PipelineError;
use assetpipe::tasks::{BuildStep, StepRunner, default_plan, run_plan};
use assetpipe_test_utils::{RecordingRunner, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn default_plan_runs_stages_in_order() -> TestResult {
    init_tracing();
    let runner = RecordingRunner::new().with_delay(Duration::from_millis(20));
    let shared: Arc<dyn StepRunner> = Arc::new(runner.clone());

    let reports = with_timeout(run_plan(shared, default_plan())).await?;
    assert_eq!(reports.len(), 5);

    let started = runner.started();
    assert_eq!(&started[..2], &[BuildStep::Clean, BuildStep::Styles]);
    let mut last_stage = started[2..].to_vec();
    last_stage.sort();
    assert_eq!(
        last_stage,
        vec![BuildStep::Scripts, BuildStep::Images, BuildStep::Fonts]
    );

    // Styles finished before anything in the parallel stage started.
    let finished = runner.finished();
    assert_eq!(finished[1], BuildStep::Styles);
    Ok(())
}

#[tokio::test]
async fn failing_clean_halts_everything_after_it() -> TestResult {
    init_tracing();
    let runner = RecordingRunner::new().failing(BuildStep::Clean);
    let shared: Arc<dyn StepRunner> = Arc::new(runner.clone());

    let result = with_timeout(run_plan(shared, default_plan())).await;
    assert!(matches!(result, Err(PipelineError::Other(_))), "{result:?}");
    assert_eq!(runner.started(), vec![BuildStep::Clean]);
    Ok(())
}

#[tokio::test]
async fn parallel_siblings_finish_even_when_one_fails() -> TestResult {
    init_tracing();
    let runner = RecordingRunner::new()
        .failing(BuildStep::Images)
        .with_delay(Duration::from_millis(20));
    let shared: Arc<dyn StepRunner> = Arc::new(runner.clone());

    let result = with_timeout(run_plan(shared, default_plan())).await;
    match result {
        Err(PipelineError::StepsFailed(failures)) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].step, BuildStep::Images);
        }
        other => panic!("Expected StepsFailed, got: {other:?}"),
    }

    let mut finished = runner.finished();
    finished.sort();
    assert_eq!(
        finished,
        vec![
            BuildStep::Clean,
            BuildStep::Styles,
            BuildStep::Scripts,
            BuildStep::Images,
            BuildStep::Fonts
        ]
    );
    Ok(())
}

#[tokio::test]
async fn a_later_stage_never_starts_after_a_failure() -> TestResult {
    let runner = RecordingRunner::new().failing(BuildStep::Styles);
    let shared: Arc<dyn StepRunner> = Arc::new(runner.clone());

    let plan = vec![vec![BuildStep::Styles], vec![BuildStep::Fonts]];
    assert!(run_plan(shared, plan).await.is_err());
    assert_eq!(runner.started(), vec![BuildStep::Styles]);
    Ok(())
}
