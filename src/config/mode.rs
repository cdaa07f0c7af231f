// src/config/mode.rs

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::config::settings::{AssetGroup, Config, GroupKind};

/// Development vs production. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Source maps, readable output.
    #[default]
    Development,
    /// Minified output, no source maps.
    Production,
}

impl BuildMode {
    /// Resolve the mode from the CLI flag, falling back to `ASSETPIPE_ENV`.
    pub fn resolve(production_flag: bool) -> Self {
        if production_flag {
            return BuildMode::Production;
        }
        match std::env::var("ASSETPIPE_ENV") {
            Ok(v) if v.trim().eq_ignore_ascii_case("production") => BuildMode::Production,
            _ => BuildMode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }

    /// Value exported to the supervised server process.
    pub fn as_env_value(self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_env_value())
    }
}

/// Everything a task needs to know about the current invocation.
///
/// Constructed once at startup and shared (behind an `Arc`) with every task;
/// nothing in here changes afterwards.
#[derive(Debug, Clone)]
pub struct BuildContext {
    root: PathBuf,
    config: Config,
    mode: BuildMode,
}

impl BuildContext {
    pub fn new(root: impl Into<PathBuf>, config: Config, mode: BuildMode) -> Self {
        Self {
            root: root.into(),
            config,
            mode,
        }
    }

    /// Project root; all globs and relative paths resolve against it.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Absolute output root.
    pub fn output_root(&self) -> PathBuf {
        self.root.join(&self.config.output)
    }

    /// Output root relative to the project root, forward slashes.
    pub fn output_rel(&self) -> String {
        self.config
            .output
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Absolute destination directory of a group.
    pub fn dest_dir(&self, kind: GroupKind) -> PathBuf {
        self.output_root().join(&self.config.group(kind).dest)
    }

    pub fn group(&self, kind: GroupKind) -> &AssetGroup {
        self.config.group(kind)
    }

    /// Directory for the pipeline's own bookkeeping (image cache).
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".assetpipe")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_flag_wins() {
        assert_eq!(BuildMode::resolve(true), BuildMode::Production);
    }

    #[test]
    fn destinations_resolve_under_output_root() {
        let ctx = BuildContext::new("/proj", Config::default(), BuildMode::Development);
        assert_eq!(ctx.output_root(), PathBuf::from("/proj/dist"));
        assert_eq!(ctx.dest_dir(GroupKind::Fonts), PathBuf::from("/proj/dist/fonts"));
    }

    #[test]
    fn output_rel_drops_leading_dot() {
        let mut config = Config::default();
        config.output = PathBuf::from("./public/build");
        let ctx = BuildContext::new("/proj", config, BuildMode::Development);
        assert_eq!(ctx.output_rel(), "public/build");
    }
}
