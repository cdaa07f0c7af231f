// src/tasks/cache.rs

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::errors::Result;

/// Content hashes of sources that have already been transformed.
///
/// The file format is line-based, hash first so paths may contain spaces:
///
/// ```text
/// <hex blake3> <relative source path>
/// ```
#[derive(Debug, Clone)]
pub struct HashCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl HashCache {
    /// Load the cache at `path`; a missing file is an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = BTreeMap::new();

        if path.exists() {
            let file = File::open(&path)
                .with_context(|| format!("opening cache file at {:?}", path))?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Some((hash, source)) = trimmed.split_once(char::is_whitespace) {
                    entries.insert(source.trim().to_string(), hash.to_string());
                }
            }
        }

        debug!(path = ?path, entries = entries.len(), "loaded hash cache");
        Ok(Self { path, entries })
    }

    /// True when `source` was last transformed from exactly `hash`.
    pub fn is_fresh(&self, source: &str, hash: &str) -> bool {
        self.entries.get(source).is_some_and(|h| h == hash)
    }

    pub fn record(&mut self, source: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(source.into(), hash.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache directory at {:?}", parent))?;
        }

        let file = File::create(&self.path)
            .with_context(|| format!("creating cache file at {:?}", self.path))?;
        let mut writer = BufWriter::new(file);
        for (source, hash) in &self.entries {
            writeln!(writer, "{hash} {source}")?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// BLAKE3 hex digest of a byte slice.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// BLAKE3 over the source bytes and the encoder settings that turned them
/// into the output. A settings change invalidates the entry.
pub fn keyed_content_hash(bytes: &[u8], settings: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(bytes);
    hasher.update(&[0]);
    hasher.update(settings.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Location of the image cache inside the state directory.
pub fn image_cache_path(state_dir: &Path) -> PathBuf {
    state_dir.join("images")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_survives_a_save_load_cycle_with_spaces_in_paths() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = image_cache_path(dir.path());

        let mut cache = HashCache::load(&path)?;
        assert!(cache.is_empty());
        cache.record("src/images/my photo.jpg", "abc123");
        cache.save()?;

        let reloaded = HashCache::load(&path)?;
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.is_fresh("src/images/my photo.jpg", "abc123"));
        assert!(!reloaded.is_fresh("src/images/my photo.jpg", "def456"));
        Ok(())
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
    }

    #[test]
    fn keyed_hash_depends_on_settings() {
        let q80 = keyed_content_hash(b"abc", "jpeg q80");
        assert_eq!(q80, keyed_content_hash(b"abc", "jpeg q80"));
        assert_ne!(q80, keyed_content_hash(b"abc", "jpeg q40"));
        assert_ne!(keyed_content_hash(b"abc", "copy"), content_hash(b"abc"));
    }
}
