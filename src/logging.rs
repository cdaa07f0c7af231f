// src/logging.rs

//! Logging setup for `assetpipe`.
//!
//! Everything the pipeline says goes through `tracing` to STDERR, including
//! the supervised server's own stdout/stderr lines (re-emitted under the
//! `assetpipe::server` target). STDOUT is reserved for `--dry-run` output.
//!
//! Filtering:
//! - `--log-level` sets one level for the whole process.
//! - otherwise `ASSETPIPE_LOG` is read as an `EnvFilter` directive string,
//!   so `ASSETPIPE_LOG=info,assetpipe::server=debug` works.
//! - otherwise `info` for this crate, `warn` for the HTTP stack.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "ASSETPIPE_LOG";

const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn,axum=warn";

/// Install the global subscriber. Call once, from `main`.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level_directive(level));
    }
    env.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
