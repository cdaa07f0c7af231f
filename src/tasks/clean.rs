// src/tasks/clean.rs

use std::io::ErrorKind;

use tracing::{debug, info};

use crate::config::BuildContext;
use crate::errors::{PipelineError, Result};
use crate::tasks::registry::BuildStep;
use crate::tasks::report::TaskReport;

/// Delete the output root. A missing directory counts as clean.
pub async fn clean(ctx: &BuildContext) -> Result<TaskReport> {
    let path = ctx.output_root();
    let mut report = TaskReport::new(BuildStep::Clean);

    match tokio::fs::remove_dir_all(&path).await {
        Ok(()) => info!(path = ?path, "removed output root"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = ?path, "output root already absent")
        }
        Err(source) => return Err(PipelineError::Clean { path, source }),
    }

    report.removed = Some(path);
    Ok(report)
}
