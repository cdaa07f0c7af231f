// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed raw data model (`model.rs`).
//! - Convert it into the typed, validated [`Config`] (`settings.rs`,
//!   `validate.rs`).
//! - Load a config file from disk or fall back to defaults (`loader.rs`).
//! - Carry the immutable per-invocation [`BuildContext`] (`mode.rs`).

pub mod loader;
pub mod mode;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path};
pub use mode::{BuildContext, BuildMode};
pub use model::{RawAssetGroup, RawConcat, RawConfig, RawImages, RawPaths, RawScripts, RawServe};
pub use settings::{AssetGroup, Config, GroupKind, ServeSettings};
pub use validate::validate_config;
