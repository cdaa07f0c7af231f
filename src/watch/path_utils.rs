// src/watch/path_utils.rs

//! Path normalization for globs and watcher events.

use std::path::Path;

/// `path` relative to `root` with forward slashes.
///
/// Falls back to canonicalized paths (symlinked temp dirs on macOS). A
/// removed file can't be canonicalized, so its parent is resolved instead.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(normalize(rel));
    }

    let root = root.canonicalize().ok()?;
    let resolved = path.canonicalize().ok().or_else(|| {
        let parent = path.parent()?.canonicalize().ok()?;
        Some(parent.join(path.file_name()?))
    })?;

    resolved.strip_prefix(&root).ok().map(normalize)
}

fn normalize(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_the_root() {
        let rel = relative_str(Path::new("/p"), Path::new("/p/src/a.js"));
        assert_eq!(rel.as_deref(), Some("src/a.js"));
    }

    #[test]
    fn unrelated_paths_are_none() {
        assert_eq!(relative_str(Path::new("/p"), Path::new("/q/a.js")), None);
    }

    #[test]
    fn removed_files_still_resolve() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let canonical = dir.path().canonicalize()?;
        let gone = canonical.join("gone.css");
        let rel = relative_str(dir.path(), &gone);
        assert_eq!(rel.as_deref(), Some("gone.css"));
        Ok(())
    }
}
