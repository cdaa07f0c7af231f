// src/tasks/report.rs

use std::path::PathBuf;

use tracing::info;

use crate::tasks::registry::BuildStep;

/// A file written by a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// What a single step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub step: BuildStep,
    pub outputs: Vec<OutputFile>,
    /// Non-fatal lint findings.
    pub diagnostics: Vec<String>,
    /// Sources that went through a transformation this run (images).
    pub transformed: Vec<String>,
    /// Sources skipped because the cache said they were unchanged.
    pub cached: Vec<String>,
    /// Directory removed by `clean`.
    pub removed: Option<PathBuf>,
}

impl TaskReport {
    pub fn new(step: BuildStep) -> Self {
        Self {
            step,
            outputs: Vec::new(),
            diagnostics: Vec::new(),
            transformed: Vec::new(),
            cached: Vec::new(),
            removed: None,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.outputs.iter().map(|o| o.bytes).sum()
    }

    pub fn log_summary(&self) {
        info!(
            task = %self.step,
            files = self.outputs.len(),
            bytes = self.total_bytes(),
            diagnostics = self.diagnostics.len(),
            cached = self.cached.len(),
            "step finished"
        );
    }
}
