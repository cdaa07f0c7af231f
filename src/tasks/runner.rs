// src/tasks/runner.rs

//! Step execution seam.
//!
//! The plan and the watch runtime talk to a `StepRunner` instead of calling
//! the step implementations directly, so tests can substitute a runner that
//! records calls and fails on demand.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::BuildContext;
use crate::errors::Result;
use crate::tasks::registry::{BuildStep, run_step};
use crate::tasks::report::TaskReport;

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + 'a>>;

/// Something that can execute a build step.
pub trait StepRunner: Send + Sync {
    fn run(&self, step: BuildStep) -> StepFuture<'_>;
}

/// Runs steps for real against a shared build context.
#[derive(Debug, Clone)]
pub struct ContextRunner {
    ctx: Arc<BuildContext>,
}

impl ContextRunner {
    pub fn new(ctx: Arc<BuildContext>) -> Self {
        Self { ctx }
    }
}

impl StepRunner for ContextRunner {
    fn run(&self, step: BuildStep) -> StepFuture<'_> {
        let ctx = Arc::clone(&self.ctx);
        Box::pin(run_step(ctx, step))
    }
}
