use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetpipe::errors::PipelineError;
use assetpipe::tasks::{BuildStep, StepFuture, StepRunner, TaskReport};

/// A fake step runner that:
/// - records the order in which steps were started and finished
/// - fails the steps it was told to fail
/// - optionally sleeps per step so overlap is observable
#[derive(Clone, Default)]
pub struct RecordingRunner {
    started: Arc<Mutex<Vec<BuildStep>>>,
    finished: Arc<Mutex<Vec<BuildStep>>>,
    failing: HashSet<BuildStep>,
    delay: Option<Duration>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, step: BuildStep) -> Self {
        self.failing.insert(step);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn started(&self) -> Vec<BuildStep> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<BuildStep> {
        self.finished.lock().unwrap().clone()
    }
}

impl StepRunner for RecordingRunner {
    fn run(&self, step: BuildStep) -> StepFuture<'_> {
        Box::pin(async move {
            self.started.lock().unwrap().push(step);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.finished.lock().unwrap().push(step);

            if self.failing.contains(&step) {
                return Err(PipelineError::Other(anyhow::anyhow!("{step} failed on purpose")));
            }
            Ok(TaskReport::new(step))
        })
    }
}
