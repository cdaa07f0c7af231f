#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetpipe::config::{BuildContext, BuildMode, Config, DEFAULT_CONFIG_FILE, load_and_validate};
use tempfile::TempDir;

/// Builds a throwaway project directory: source files plus an optional
/// `Assetpipe.toml`.
pub struct ProjectBuilder {
    files: Vec<(PathBuf, Vec<u8>)>,
    config: Option<String>,
    mode: BuildMode,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            config: None,
            mode: BuildMode::Development,
        }
    }

    pub fn file(mut self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        self.files.push((PathBuf::from(rel), contents.as_ref().to_vec()));
        self
    }

    /// Raw TOML for `Assetpipe.toml`. Without it the built-in layout applies.
    pub fn config(mut self, toml: &str) -> Self {
        self.config = Some(toml.to_string());
        self
    }

    pub fn production(mut self) -> Self {
        self.mode = BuildMode::Production;
        self
    }

    pub fn build(self) -> Project {
        let dir = tempfile::tempdir().expect("Failed to create temp project dir");
        let root = dir.path().to_path_buf();

        for (rel, contents) in &self.files {
            write_file(&root, rel, contents);
        }
        if let Some(toml) = &self.config {
            write_file(&root, Path::new(DEFAULT_CONFIG_FILE), toml.as_bytes());
        }

        let config = load_and_validate(root.join(DEFAULT_CONFIG_FILE), false)
            .expect("Failed to build valid config from builder");
        let ctx = Arc::new(BuildContext::new(root, config, self.mode));

        Project { _dir: dir, ctx }
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(root: &Path, rel: &Path, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(&path, contents).expect("Failed to write fixture file");
}

/// A built fixture. The directory lives as long as this value.
pub struct Project {
    _dir: TempDir,
    ctx: Arc<BuildContext>,
}

impl Project {
    pub fn ctx(&self) -> Arc<BuildContext> {
        Arc::clone(&self.ctx)
    }

    pub fn root(&self) -> &Path {
        self.ctx.root()
    }

    /// Same files and config, other build mode.
    pub fn with_mode(&self, mode: BuildMode) -> Arc<BuildContext> {
        Arc::new(BuildContext::new(
            self.ctx.root(),
            self.ctx.config().clone(),
            mode,
        ))
    }

    /// Same files and mode, with the config adjusted by `edit`.
    pub fn with_config(&self, edit: impl FnOnce(&mut Config)) -> Arc<BuildContext> {
        let mut config = self.ctx.config().clone();
        edit(&mut config);
        Arc::new(BuildContext::new(self.ctx.root(), config, self.ctx.mode()))
    }

    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) {
        write_file(self.root(), Path::new(rel), contents.as_ref());
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel))
            .unwrap_or_else(|e| panic!("Failed to read {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).exists()
    }

    /// Every file under the output root, relative to the project root,
    /// sorted.
    pub fn output_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        collect(self.root(), &self.ctx.output_root(), &mut files);
        files.sort();
        files
    }
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}
