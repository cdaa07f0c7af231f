// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::config::model::RawConfig;
use crate::config::settings::Config;
use crate::errors::Result;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "Assetpipe.toml";

/// Load the raw TOML model from a path.
///
/// This only performs deserialization; defaults and validation happen in
/// [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;

    let raw: RawConfig = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a configuration file and convert it into a validated [`Config`].
///
/// When `required` is false and the file does not exist, the built-in
/// layout is used instead. An explicitly requested file must exist.
pub fn load_and_validate(path: impl AsRef<Path>, required: bool) -> Result<Config> {
    let path = path.as_ref();

    if !required && !path.exists() {
        info!(path = ?path, "no config file found; using built-in layout");
        return Ok(Config::default());
    }

    let raw = load_from_path(path)?;
    Config::try_from(raw)
}
