// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::tasks::TaskId;

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build, watch and serve static assets (styles, scripts, images, fonts).",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run. Defaults to the full build.
    #[arg(value_enum, value_name = "TASK", default_value_t = TaskId::Default)]
    pub task: TaskId,

    /// Build in production mode (minified, no source maps).
    ///
    /// `ASSETPIPE_ENV=production` has the same effect.
    #[arg(long, global = true)]
    pub production: bool,

    /// Path to the config file (TOML).
    ///
    /// If omitted, `Assetpipe.toml` in the current directory is used when it
    /// exists; otherwise the built-in layout applies.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config and print the plan, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_defaults_to_full_build() {
        let args = CliArgs::parse_from(["assetpipe"]);
        assert_eq!(args.task, TaskId::Default);
        assert!(!args.production);
    }

    #[test]
    fn production_flag_is_accepted_after_task() {
        let args = CliArgs::parse_from(["assetpipe", "styles", "--production"]);
        assert_eq!(args.task, TaskId::Styles);
        assert!(args.production);
    }
}
