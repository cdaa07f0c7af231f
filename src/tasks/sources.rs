// src/tasks/sources.rs

//! Glob expansion for asset groups.
//!
//! Sources come back in a deterministic order: lexicographic by path relative
//! to the project root, unless the group lists an explicit `order`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::{AssetGroup, BuildContext, GroupKind};
use crate::errors::{PipelineError, Result};
use crate::watch::path_utils::relative_str;

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the project root, forward slashes.
    pub rel: String,
    /// Path relative to the literal directory prefix of the glob that
    /// matched it. Per-file outputs keep this layout under `dest`.
    pub base_rel: PathBuf,
}

/// Collect the sources of a group, skipping anything under the output root.
pub fn collect_group_sources(ctx: &BuildContext, kind: GroupKind) -> Result<Vec<SourceFile>> {
    collect_sources(ctx.root(), ctx.group(kind), Some(&ctx.output_rel()))
}

/// Expand a group's globs under `root`.
///
/// `skip_prefix` is a root-relative directory whose contents are never
/// returned (the output root, so `**/*.css` doesn't pick up build output).
pub fn collect_sources(
    root: &Path,
    group: &AssetGroup,
    skip_prefix: Option<&str>,
) -> Result<Vec<SourceFile>> {
    if let Some(order) = &group.order {
        return ordered_sources(root, group.kind, order);
    }

    let exclude = build_globset(&group.exclude)?;
    let mut found: BTreeMap<String, SourceFile> = BTreeMap::new();

    for pattern in &group.src {
        let matcher = Glob::new(strip_dot_prefix(pattern))
            .with_context(|| format!("invalid glob pattern: {pattern}"))?
            .compile_matcher();
        let base = root.join(glob_base(pattern));
        if !base.exists() {
            continue;
        }

        for entry in WalkDir::new(&base).follow_links(true) {
            let entry = entry.with_context(|| format!("walking {:?}", base))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(rel) = relative_str(root, entry.path()) else {
                continue;
            };
            if !matcher.is_match(&rel) || exclude.is_match(&rel) {
                continue;
            }
            if skip_prefix.is_some_and(|prefix| is_under(&rel, prefix)) {
                continue;
            }

            let base_rel = entry
                .path()
                .strip_prefix(&base)
                .ok()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(entry.file_name()));

            found.entry(rel.clone()).or_insert_with(|| SourceFile {
                path: entry.path().to_path_buf(),
                rel,
                base_rel,
            });
        }
    }

    Ok(found.into_values().collect())
}

fn ordered_sources(root: &Path, kind: GroupKind, order: &[PathBuf]) -> Result<Vec<SourceFile>> {
    order
        .iter()
        .map(|rel_path| {
            let path = root.join(rel_path);
            if !path.is_file() {
                return Err(PipelineError::ConfigError(format!(
                    "[{kind}].order lists {:?}, which is not a file",
                    rel_path
                )));
            }
            let base_rel = rel_path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| rel_path.clone());
            Ok(SourceFile {
                rel: rel_path.to_string_lossy().replace('\\', "/"),
                path,
                base_rel,
            })
        })
        .collect()
}

/// Literal directory prefix of a glob: `src/styles/**/*.scss` -> `src/styles`.
///
/// A pattern without glob syntax is a single file; its parent is the base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = parts
        .iter()
        .take_while(|part| !part.contains(['*', '?', '[', '{']))
        .copied()
        .collect();

    let literal = if literal.len() == parts.len() {
        &literal[..literal.len().saturating_sub(1)]
    } else {
        &literal[..]
    };

    literal
        .iter()
        .filter(|part| !part.is_empty() && **part != ".")
        .collect()
}

/// `./src/**/*.css` -> `src/**/*.css`. Matching happens against
/// root-relative paths, which never carry a leading `./`.
pub fn strip_dot_prefix(pattern: &str) -> &str {
    let mut rest = pattern;
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped.trim_start_matches('/');
    }
    rest
}

pub fn is_under(rel: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    rel == prefix || rel.starts_with(&format!("{prefix}/"))
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(strip_dot_prefix(pat))
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build().context("building exclude globset")?)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::Config;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("src/styles/**/*.scss"), PathBuf::from("src/styles"));
        assert_eq!(glob_base("*.css"), PathBuf::new());
        assert_eq!(glob_base("src/app.js"), PathBuf::from("src"));
        assert_eq!(glob_base("./assets/{a,b}/*.png"), PathBuf::from("assets"));
    }

    #[test]
    fn dot_slash_patterns_match_root_relative_paths() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "src/styles/a.css");
        touch(dir.path(), "src/styles/vendor/b.css");

        let mut group = Config::default().styles;
        group.src = vec!["./src/styles/**/*.css".into()];
        group.exclude = vec!["./src/styles/vendor/**".into()];

        let found = collect_sources(dir.path(), &group, None)?;
        let rels: Vec<&str> = found.iter().map(|s| s.rel.as_str()).collect();
        assert_eq!(rels, vec!["src/styles/a.css"]);
        assert_eq!(found[0].base_rel, PathBuf::from("a.css"));
        assert_eq!(strip_dot_prefix("././x/*.js"), "x/*.js");
        Ok(())
    }

    #[test]
    fn sources_come_back_sorted_and_deduplicated() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "src/scripts/z.js");
        touch(dir.path(), "src/scripts/a.js");
        touch(dir.path(), "src/scripts/lib/m.js");

        let mut group = Config::default().scripts;
        group.src = vec!["src/scripts/**/*.js".into(), "src/scripts/*.js".into()];

        let found = collect_sources(dir.path(), &group, None)?;
        let rels: Vec<&str> = found.iter().map(|s| s.rel.as_str()).collect();
        assert_eq!(
            rels,
            vec!["src/scripts/a.js", "src/scripts/lib/m.js", "src/scripts/z.js"]
        );
        assert_eq!(found[1].base_rel, PathBuf::from("lib/m.js"));
        Ok(())
    }

    #[test]
    fn excludes_and_output_root_are_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "a.css");
        touch(dir.path(), "vendor/b.css");
        touch(dir.path(), "dist/styles/main.css");

        let mut group = Config::default().styles;
        group.src = vec!["**/*.css".into()];
        group.exclude = vec!["vendor/**".into()];

        let found = collect_sources(dir.path(), &group, Some("dist"))?;
        let rels: Vec<&str> = found.iter().map(|s| s.rel.as_str()).collect();
        assert_eq!(rels, vec!["a.css"]);
        Ok(())
    }

    #[test]
    fn explicit_order_is_kept_verbatim() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "js/a.js");
        touch(dir.path(), "js/b.js");

        let mut group = Config::default().scripts;
        group.order = Some(vec!["js/b.js".into(), "js/a.js".into()]);

        let found = collect_sources(dir.path(), &group, None)?;
        let rels: Vec<&str> = found.iter().map(|s| s.rel.as_str()).collect();
        assert_eq!(rels, vec!["js/b.js", "js/a.js"]);
        Ok(())
    }

    #[test]
    fn explicit_order_with_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut group = Config::default().scripts;
        group.order = Some(vec!["js/missing.js".into()]);
        assert!(collect_sources(dir.path(), &group, None).is_err());
    }
}
