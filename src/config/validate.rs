// src/config/validate.rs

use std::path::{Component, Path};

use globset::Glob;
use lightningcss::targets::Browsers;
use oxc::transformer::TransformOptions;
use regex::Regex;

use crate::config::settings::{AssetGroup, Config, ServeSettings};
use crate::errors::{PipelineError, Result};

/// Run semantic validation against a converted configuration.
///
/// This checks:
/// - the output root and every destination are plain relative paths
/// - every glob pattern compiles
/// - group destinations are pairwise disjoint
/// - `concat` is only used where the pipeline concatenates
/// - the browser list and script target are understood by the compilers
/// - `[serve]` has a command, a parseable upstream and a valid regex
pub fn validate_config(cfg: &Config) -> Result<()> {
    ensure_relative("[paths].output", &cfg.output)?;

    for group in cfg.groups() {
        validate_group(group)?;
    }
    validate_disjoint_destinations(cfg)?;
    validate_compiler_options(cfg)?;

    if let Some(serve) = &cfg.serve {
        validate_serve(serve)?;
    }

    Ok(())
}

fn config_error(msg: impl Into<String>) -> PipelineError {
    PipelineError::ConfigError(msg.into())
}

fn ensure_relative(what: &str, path: &Path) -> Result<()> {
    if normalize(path).as_os_str().is_empty() {
        return Err(config_error(format!(
            "{what} must name a directory below the project root (got {:?})",
            path
        )));
    }
    let plain = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return Err(config_error(format!(
            "{what} must be a relative path without '..' (got {:?})",
            path
        )));
    }
    Ok(())
}

fn validate_globs(what: &str, patterns: &[String]) -> Result<()> {
    for pat in patterns {
        Glob::new(pat)
            .map_err(|e| config_error(format!("{what}: invalid glob pattern '{pat}': {e}")))?;
    }
    Ok(())
}

fn validate_group(group: &AssetGroup) -> Result<()> {
    let name = group.kind.name();

    if group.src.is_empty() && group.order.is_none() {
        return Err(config_error(format!("[{name}].src must list at least one glob")));
    }
    validate_globs(&format!("[{name}].src"), &group.src)?;
    validate_globs(&format!("[{name}].exclude"), &group.exclude)?;
    ensure_relative(&format!("[{name}].dest"), &group.dest)?;

    if let Some(concat) = &group.concat {
        if !group.kind.supports_concat() {
            return Err(config_error(format!(
                "[{name}].concat is not supported for {name}"
            )));
        }
        if concat.trim().is_empty() || concat.contains(['/', '\\']) {
            return Err(config_error(format!(
                "[{name}].concat must be a plain file name (got '{concat}')"
            )));
        }
    }

    if let Some(order) = &group.order {
        if order.is_empty() {
            return Err(config_error(format!("[{name}].order must not be empty")));
        }
        for path in order {
            ensure_relative(&format!("[{name}].order entry"), path)?;
        }
    }

    Ok(())
}

/// No destination may equal or contain another one.
fn validate_disjoint_destinations(cfg: &Config) -> Result<()> {
    let groups: Vec<&AssetGroup> = cfg.groups().collect();
    for (i, a) in groups.iter().enumerate() {
        for b in groups.iter().skip(i + 1) {
            let da = normalize(&a.dest);
            let db = normalize(&b.dest);
            if da.starts_with(&db) || db.starts_with(&da) {
                return Err(config_error(format!(
                    "destinations of [{}] ({:?}) and [{}] ({:?}) overlap",
                    a.kind, a.dest, b.kind, b.dest
                )));
            }
        }
    }
    Ok(())
}

fn normalize(path: &Path) -> std::path::PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

fn validate_compiler_options(cfg: &Config) -> Result<()> {
    Browsers::from_browserslist(cfg.browsers.iter().map(String::as_str))
        .map_err(|e| config_error(format!("[browsers].list: {e}")))?;

    TransformOptions::from_target(&cfg.script_target)
        .map_err(|e| config_error(format!("[scripts].target: {e}")))?;

    if !(1..=100).contains(&cfg.jpeg_quality) {
        return Err(config_error(format!(
            "[images].jpeg_quality must be within 1..=100 (got {})",
            cfg.jpeg_quality
        )));
    }
    Ok(())
}

fn validate_serve(serve: &ServeSettings) -> Result<()> {
    if serve.cmd.trim().is_empty() {
        return Err(config_error("[serve].cmd must not be empty"));
    }
    validate_globs("[serve].watch", &serve.watch)?;

    reqwest::Url::parse(&serve.upstream)
        .map_err(|e| config_error(format!("[serve].upstream '{}': {e}", serve.upstream)))?;

    if let Some(pattern) = &serve.ready_pattern {
        Regex::new(pattern)
            .map_err(|e| config_error(format!("[serve].ready_pattern: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn nested_destinations_are_rejected() {
        let mut cfg = Config::default();
        cfg.images.dest = PathBuf::from("styles/img");
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("overlap"), "{err}");
    }

    #[test]
    fn parent_dir_output_is_rejected() {
        let mut cfg = Config::default();
        cfg.output = PathBuf::from("../dist");
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn current_dir_output_is_rejected() {
        for output in ["", ".", "./."] {
            let mut cfg = Config::default();
            cfg.output = PathBuf::from(output);
            let err = validate_config(&cfg).unwrap_err();
            assert!(err.to_string().contains("[paths].output"), "{output:?}: {err}");
        }

        let mut cfg = Config::default();
        cfg.output = PathBuf::from("./public");
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn concat_on_images_is_rejected() {
        let mut cfg = Config::default();
        cfg.images.concat = Some("sprites.png".into());
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn bad_glob_is_rejected() {
        let mut cfg = Config::default();
        cfg.fonts.src = vec!["src/fonts/[".into()];
        assert!(validate_config(&cfg).is_err());
    }
}
