// src/tasks/registry.rs

use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;

use crate::config::{BuildContext, GroupKind};
use crate::errors::Result;
use crate::tasks::report::TaskReport;
use crate::tasks::{clean, fonts, images, scripts, styles};

/// Every task name accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum TaskId {
    /// Delete the output root.
    Clean,
    /// clean -> styles -> (scripts, images, fonts).
    Default,
    Styles,
    Scripts,
    Images,
    Fonts,
    /// Rebuild asset groups when their sources change.
    Watch,
    /// Build, then supervise the app server behind a live-reload proxy.
    Serve,
}

impl TaskId {
    /// The single build step behind this task, if it is one.
    pub fn step(self) -> Option<BuildStep> {
        match self {
            TaskId::Clean => Some(BuildStep::Clean),
            TaskId::Styles => Some(BuildStep::Styles),
            TaskId::Scripts => Some(BuildStep::Scripts),
            TaskId::Images => Some(BuildStep::Images),
            TaskId::Fonts => Some(BuildStep::Fonts),
            TaskId::Default | TaskId::Watch | TaskId::Serve => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TaskId::Clean => "clean",
            TaskId::Default => "default",
            TaskId::Styles => "styles",
            TaskId::Scripts => "scripts",
            TaskId::Images => "images",
            TaskId::Fonts => "fonts",
            TaskId::Watch => "watch",
            TaskId::Serve => "serve",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A leaf unit of work that produces (or removes) output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildStep {
    Clean,
    Styles,
    Scripts,
    Images,
    Fonts,
}

impl BuildStep {
    pub fn for_group(kind: GroupKind) -> Self {
        match kind {
            GroupKind::Styles => BuildStep::Styles,
            GroupKind::Scripts => BuildStep::Scripts,
            GroupKind::Images => BuildStep::Images,
            GroupKind::Fonts => BuildStep::Fonts,
        }
    }

    pub fn group(self) -> Option<GroupKind> {
        match self {
            BuildStep::Clean => None,
            BuildStep::Styles => Some(GroupKind::Styles),
            BuildStep::Scripts => Some(GroupKind::Scripts),
            BuildStep::Images => Some(GroupKind::Images),
            BuildStep::Fonts => Some(GroupKind::Fonts),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuildStep::Clean => "clean",
            BuildStep::Styles => "styles",
            BuildStep::Scripts => "scripts",
            BuildStep::Images => "images",
            BuildStep::Fonts => "fonts",
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run one build step against the given context.
pub async fn run_step(ctx: Arc<BuildContext>, step: BuildStep) -> Result<TaskReport> {
    match step {
        BuildStep::Clean => clean::clean(&ctx).await,
        BuildStep::Styles => styles::compile_styles(ctx).await,
        BuildStep::Scripts => scripts::compile_scripts(ctx).await,
        BuildStep::Images => images::optimize_images(ctx).await,
        BuildStep::Fonts => fonts::copy_fonts(ctx).await,
    }
}
