// src/engine/mod.rs

//! Watch-mode orchestration.
//!
//! File changes arrive as [`RuntimeEvent`]s already tagged with what they
//! affect. The pure state machine in [`core`] turns each event into
//! commands; the async shell in [`runtime`] carries them out (spawning
//! steps, restarting the server, pushing live-reload messages).

use crate::tasks::BuildStep;

/// What a watched path is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    /// Re-run one asset group's step.
    Rebuild(BuildStep),
    /// Application file: restart the dev server.
    RestartServer,
    /// Built output changed: tell connected browsers.
    PushAsset,
}

/// Result of a step spawned by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Failed(String),
}

/// Events flowing into the runtime from the watcher, spawned steps and
/// signal handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// A watched file changed. `path` is relative to the project root.
    FileChanged { target: WatchTarget, path: String },
    StepCompleted { step: BuildStep, outcome: StepOutcome },
    /// Ctrl-C.
    ShutdownRequested,
}

pub mod core;
pub mod runtime;

pub use core::{CoreCommand, CoreRuntime, CoreStep};
pub use runtime::Runtime;
