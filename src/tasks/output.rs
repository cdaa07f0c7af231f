// src/tasks/output.rs

use std::path::Path;

use anyhow::Context;

use crate::errors::Result;
use crate::tasks::report::OutputFile;

/// Write `bytes` to `path`, creating parent directories first.
pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<OutputFile> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating output directory {:?}", parent))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("writing output file {:?}", path))?;

    Ok(OutputFile {
        path: path.to_path_buf(),
        bytes: bytes.len() as u64,
    })
}
