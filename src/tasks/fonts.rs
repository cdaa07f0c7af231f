// src/tasks/fonts.rs

use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::config::{BuildContext, GroupKind};
use crate::errors::Result;
use crate::tasks::registry::BuildStep;
use crate::tasks::report::{OutputFile, TaskReport};
use crate::tasks::sources::collect_group_sources;

/// Copy font files unchanged into the fonts destination.
pub async fn copy_fonts(ctx: Arc<BuildContext>) -> Result<TaskReport> {
    let sources = collect_group_sources(&ctx, GroupKind::Fonts)?;
    let dest = ctx.dest_dir(GroupKind::Fonts);
    let mut report = TaskReport::new(BuildStep::Fonts);

    for source in sources {
        let target = dest.join(&source.base_rel);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating font directory {:?}", parent))?;
        }
        let bytes = tokio::fs::copy(&source.path, &target)
            .await
            .with_context(|| format!("copying {} to {:?}", source.rel, target))?;
        debug!(source = %source.rel, target = ?target, "copied font");
        report.outputs.push(OutputFile { path: target, bytes });
    }

    report.log_summary();
    Ok(report)
}
