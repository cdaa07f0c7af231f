// src/tasks/mod.rs

//! Build steps and their orchestration.
//!
//! - [`registry`] maps the CLI task names onto typed identifiers and
//!   dispatches a [`BuildStep`] to its implementation.
//! - [`plan`] runs stages of steps in order, steps inside a stage together.
//! - [`runner`] abstracts "run this step" so the orchestration can be
//!   exercised without touching the filesystem.
//! - One module per step: [`clean`], [`styles`], [`scripts`], [`images`],
//!   [`fonts`].

pub mod cache;
pub mod clean;
pub mod fonts;
pub mod images;
pub mod output;
pub mod plan;
pub mod registry;
pub mod report;
pub mod runner;
pub mod scripts;
pub mod sources;
pub mod styles;

pub use plan::{Stage, default_plan, run_default, run_plan};
pub use registry::{BuildStep, TaskId, run_step};
pub use report::{OutputFile, TaskReport};
pub use runner::{ContextRunner, StepFuture, StepRunner};
