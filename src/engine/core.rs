// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and answers with the commands the IO
//! shell should carry out. It owns no channels, no Tokio types and performs
//! no IO, so routing is unit-tested directly.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, StepOutcome, WatchTarget};
use crate::serve::livereload::ReloadMessage;
use crate::tasks::BuildStep;
use crate::tasks::sources::is_under;

/// Command produced by the core, executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Spawn this step. Overlapping runs of the same step are allowed.
    RunStep(BuildStep),
    /// Kill and relaunch the dev server because this file changed.
    RestartServer(PathBuf),
    /// Forward to live-reload clients.
    PushAsset(ReloadMessage),
}

/// Decision returned for a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn run(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

#[derive(Debug)]
pub struct CoreRuntime {
    /// Output root relative to the project root, forward slashes.
    output_prefix: String,
    in_flight: BTreeMap<BuildStep, usize>,
    failures: usize,
}

impl CoreRuntime {
    pub fn new(output_prefix: impl Into<String>) -> Self {
        Self {
            output_prefix: output_prefix.into().trim_end_matches('/').to_string(),
            in_flight: BTreeMap::new(),
            failures: 0,
        }
    }

    /// Number of spawned-but-unfinished runs of `step`.
    pub fn in_flight(&self, step: BuildStep) -> usize {
        self.in_flight.get(&step).copied().unwrap_or(0)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.values().all(|&n| n == 0)
    }

    /// Failed step runs since startup.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::FileChanged { target, path } => self.on_file_changed(target, path),
            RuntimeEvent::StepCompleted { step, outcome } => {
                self.on_step_completed(step, outcome);
                CoreStep::run(Vec::new())
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn on_file_changed(&mut self, target: WatchTarget, path: String) -> CoreStep {
        match target {
            WatchTarget::Rebuild(step) => {
                *self.in_flight.entry(step).or_insert(0) += 1;
                debug!(task = %step, %path, "source changed");
                CoreStep::run(vec![CoreCommand::RunStep(step)])
            }
            WatchTarget::RestartServer => {
                CoreStep::run(vec![CoreCommand::RestartServer(PathBuf::from(path))])
            }
            WatchTarget::PushAsset => {
                let commands = self
                    .output_relative(&path)
                    .and_then(ReloadMessage::for_changed_output)
                    .map(CoreCommand::PushAsset)
                    .into_iter()
                    .collect();
                CoreStep::run(commands)
            }
        }
    }

    fn on_step_completed(&mut self, step: BuildStep, outcome: StepOutcome) {
        if let Some(count) = self.in_flight.get_mut(&step) {
            *count = count.saturating_sub(1);
        }
        if let StepOutcome::Failed(message) = outcome {
            self.failures += 1;
            warn!(task = %step, "rebuild failed, still watching: {message}");
        }
    }

    fn output_relative<'a>(&self, path: &'a str) -> Option<&'a str> {
        if !is_under(path, &self.output_prefix) {
            return None;
        }
        path.get(self.output_prefix.len()..)
            .map(|rest| rest.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(target: WatchTarget, path: &str) -> RuntimeEvent {
        RuntimeEvent::FileChanged {
            target,
            path: path.to_string(),
        }
    }

    #[test]
    fn source_change_rebuilds_only_its_group() {
        let mut core = CoreRuntime::new("dist");
        let step = core.step(changed(
            WatchTarget::Rebuild(BuildStep::Styles),
            "src/styles/a.scss",
        ));
        assert_eq!(step.commands, vec![CoreCommand::RunStep(BuildStep::Styles)]);
        assert!(step.keep_running);
        assert_eq!(core.in_flight(BuildStep::Styles), 1);
        assert_eq!(core.in_flight(BuildStep::Scripts), 0);
    }

    #[test]
    fn overlapping_triggers_each_spawn_a_run() {
        let mut core = CoreRuntime::new("dist");
        for _ in 0..2 {
            core.step(changed(WatchTarget::Rebuild(BuildStep::Scripts), "src/scripts/a.js"));
        }
        assert_eq!(core.in_flight(BuildStep::Scripts), 2);

        core.step(RuntimeEvent::StepCompleted {
            step: BuildStep::Scripts,
            outcome: StepOutcome::Failed("boom".into()),
        });
        core.step(RuntimeEvent::StepCompleted {
            step: BuildStep::Scripts,
            outcome: StepOutcome::Success,
        });
        assert!(core.is_idle());
        assert_eq!(core.failures(), 1);
    }

    #[test]
    fn app_change_restarts_the_server() {
        let mut core = CoreRuntime::new("dist");
        let step = core.step(changed(WatchTarget::RestartServer, "server/app.js"));
        assert_eq!(
            step.commands,
            vec![CoreCommand::RestartServer(PathBuf::from("server/app.js"))]
        );
    }

    #[test]
    fn output_changes_become_reload_messages() {
        let mut core = CoreRuntime::new("dist/");
        let css = core.step(changed(WatchTarget::PushAsset, "dist/styles/main.css"));
        assert_eq!(
            css.commands,
            vec![CoreCommand::PushAsset(ReloadMessage::Inject {
                path: "/styles/main.css".into()
            })]
        );

        let map = core.step(changed(WatchTarget::PushAsset, "dist/styles/main.css.map"));
        assert!(map.commands.is_empty());

        let elsewhere = core.step(changed(WatchTarget::PushAsset, "distant/x.js"));
        assert!(elsewhere.commands.is_empty());
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = CoreRuntime::new("dist");
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
        assert!(step.commands.is_empty());
    }
}
