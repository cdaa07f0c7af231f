// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::tasks::BuildStep;

/// A single failed step inside a parallel stage.
#[derive(Debug)]
pub struct StepFailure {
    pub step: BuildStep,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to clean output directory {path:?}: {source}")]
    Clean {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("style compilation failed in {file}: {message}")]
    StyleCompile { file: String, message: String },

    #[error("script compilation failed in {file}: {message}")]
    ScriptCompile { file: String, message: String },

    #[error("image optimization failed for {file}: {message}")]
    ImageOptimize { file: String, message: String },

    #[error("build failed: {}", describe_failures(.0))]
    StepsFailed(Vec<StepFailure>),

    #[error("server process exited unexpectedly (exit code {code:?})")]
    ServerCrashed { code: Option<i32> },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe_failures(failures: &[StepFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.step, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
