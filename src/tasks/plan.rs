// src/tasks/plan.rs

//! Staged execution of build steps.
//!
//! A plan is a list of stages. Stages run one after another; the steps of a
//! stage run concurrently and every one of them is awaited before the stage
//! is judged. The first failing stage ends the plan.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{error, info};

use crate::config::BuildContext;
use crate::errors::{PipelineError, Result, StepFailure};
use crate::tasks::registry::BuildStep;
use crate::tasks::report::TaskReport;
use crate::tasks::runner::{ContextRunner, StepRunner};

pub type Stage = Vec<BuildStep>;

/// `clean`, then `styles`, then scripts, images and fonts together.
pub fn default_plan() -> Vec<Stage> {
    vec![
        vec![BuildStep::Clean],
        vec![BuildStep::Styles],
        vec![BuildStep::Scripts, BuildStep::Images, BuildStep::Fonts],
    ]
}

/// Execute `plan` stage by stage.
///
/// A single-step stage surfaces its own error unchanged. A stage with
/// several steps reports all of its failures together.
pub async fn run_plan(runner: Arc<dyn StepRunner>, plan: Vec<Stage>) -> Result<Vec<TaskReport>> {
    let mut reports = Vec::new();

    for (index, stage) in plan.into_iter().enumerate() {
        info!(stage = index, steps = ?stage, "starting stage");

        let results = join_all(stage.iter().map(|&step| runner.run(step))).await;

        let mut failures = Vec::new();
        let mut only_error = None;
        let single = stage.len() == 1;

        for (step, result) in stage.into_iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(task = %step, "step failed: {err}");
                    if single {
                        only_error = Some(err);
                    } else {
                        failures.push(StepFailure {
                            step,
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(err) = only_error {
            return Err(err);
        }
        if !failures.is_empty() {
            return Err(PipelineError::StepsFailed(failures));
        }
    }

    Ok(reports)
}

/// The `default` task.
pub async fn run_default(ctx: Arc<BuildContext>) -> Result<Vec<TaskReport>> {
    let runner: Arc<dyn StepRunner> = Arc::new(ContextRunner::new(ctx));
    let reports = run_plan(runner, default_plan()).await?;
    let bytes: u64 = reports.iter().map(TaskReport::total_bytes).sum();
    info!(task = "default", steps = reports.len(), bytes, "build finished");
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_cleans_first_and_fans_out_last() {
        let plan = default_plan();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], vec![BuildStep::Clean]);
        assert_eq!(plan[1], vec![BuildStep::Styles]);
        assert_eq!(plan[2].len(), 3);
    }
}
