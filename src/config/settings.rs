// src/config/settings.rs

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{RawAssetGroup, RawConcat, RawConfig, RawServe};
use crate::config::validate::validate_config;
use crate::errors::PipelineError;

pub const DEFAULT_OUTPUT_DIR: &str = "dist";
pub const DEFAULT_SCRIPT_TARGET: &str = "es2015";
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const DEFAULT_ENV_VAR: &str = "NODE_ENV";
pub const DEFAULT_UPSTREAM: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PROXY_PORT: u16 = 3000;

/// Browser list used when `[browsers]` is absent.
pub const DEFAULT_BROWSERS: &[&str] = &["> 0.5%", "last 2 versions", "not dead"];

/// The four asset categories the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKind {
    Styles,
    Scripts,
    Images,
    Fonts,
}

impl GroupKind {
    pub const ALL: [GroupKind; 4] = [
        GroupKind::Styles,
        GroupKind::Scripts,
        GroupKind::Images,
        GroupKind::Fonts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GroupKind::Styles => "styles",
            GroupKind::Scripts => "scripts",
            GroupKind::Images => "images",
            GroupKind::Fonts => "fonts",
        }
    }

    fn default_src(self) -> Vec<String> {
        let patterns: &[&str] = match self {
            GroupKind::Styles => &["src/styles/**/*.scss", "src/styles/**/*.css"],
            GroupKind::Scripts => &["src/scripts/**/*.js"],
            GroupKind::Images => &["src/images/**/*"],
            GroupKind::Fonts => &["src/fonts/**/*"],
        };
        patterns.iter().map(|p| p.to_string()).collect()
    }

    fn default_concat(self) -> Option<String> {
        match self {
            GroupKind::Styles => Some("main.css".to_string()),
            GroupKind::Scripts => Some("main.js".to_string()),
            GroupKind::Images | GroupKind::Fonts => None,
        }
    }

    /// Whether the group's pipeline can concatenate its sources.
    pub fn supports_concat(self) -> bool {
        matches!(self, GroupKind::Styles | GroupKind::Scripts)
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named category of sources with its own destination.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetGroup {
    pub kind: GroupKind,
    pub src: Vec<String>,
    pub exclude: Vec<String>,
    /// Relative to the output root.
    pub dest: PathBuf,
    pub concat: Option<String>,
    /// Explicit source order (relative to the project root).
    pub order: Option<Vec<PathBuf>>,
}

impl AssetGroup {
    fn from_raw(kind: GroupKind, raw: RawAssetGroup) -> Self {
        let concat = match raw.concat {
            Some(RawConcat::File(name)) => Some(name),
            Some(RawConcat::Enabled(false)) => None,
            Some(RawConcat::Enabled(true)) | None => kind.default_concat(),
        };

        Self {
            kind,
            src: raw.src.unwrap_or_else(|| kind.default_src()),
            exclude: raw.exclude,
            dest: PathBuf::from(raw.dest.unwrap_or_else(|| kind.name().to_string())),
            concat,
            order: raw
                .order
                .map(|list| list.into_iter().map(PathBuf::from).collect()),
        }
    }
}

/// `[serve]` settings after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeSettings {
    pub cmd: String,
    pub watch: Vec<String>,
    pub env_var: String,
    pub upstream: String,
    pub proxy_port: u16,
    pub ready_pattern: Option<String>,
    pub ready_after: Option<Duration>,
}

impl TryFrom<RawServe> for ServeSettings {
    type Error = PipelineError;

    fn try_from(raw: RawServe) -> Result<Self, Self::Error> {
        let ready_after = raw
            .ready_after
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(|e| PipelineError::ConfigError(format!("[serve].ready_after: {e}")))?;

        Ok(Self {
            cmd: raw.cmd,
            watch: raw.watch,
            env_var: raw.env_var.unwrap_or_else(|| DEFAULT_ENV_VAR.to_string()),
            upstream: raw.upstream.unwrap_or_else(|| DEFAULT_UPSTREAM.to_string()),
            proxy_port: raw.proxy_port.unwrap_or(DEFAULT_PROXY_PORT),
            ready_pattern: raw.ready_pattern,
            ready_after,
        })
    }
}

/// Validated configuration. Construct through `TryFrom<RawConfig>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Output root, relative to the project root.
    pub output: PathBuf,
    pub styles: AssetGroup,
    pub scripts: AssetGroup,
    pub images: AssetGroup,
    pub fonts: AssetGroup,
    pub browsers: Vec<String>,
    pub script_target: String,
    pub jpeg_quality: u8,
    pub serve: Option<ServeSettings>,
}

impl Config {
    pub fn group(&self, kind: GroupKind) -> &AssetGroup {
        match kind {
            GroupKind::Styles => &self.styles,
            GroupKind::Scripts => &self.scripts,
            GroupKind::Images => &self.images,
            GroupKind::Fonts => &self.fonts,
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = &AssetGroup> {
        GroupKind::ALL.into_iter().map(|kind| self.group(kind))
    }
}

impl Default for Config {
    fn default() -> Self {
        // The built-in layout always validates.
        Config::from_raw_unchecked(RawConfig::default())
    }
}

impl Config {
    fn from_raw_unchecked(raw: RawConfig) -> Self {
        let (scripts, script_target) = raw.scripts.into_parts();
        let (images, jpeg_quality) = raw.images.into_parts();
        Self {
            output: PathBuf::from(
                raw.paths
                    .output
                    .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            styles: AssetGroup::from_raw(GroupKind::Styles, raw.styles),
            scripts: AssetGroup::from_raw(GroupKind::Scripts, scripts),
            images: AssetGroup::from_raw(GroupKind::Images, images),
            fonts: AssetGroup::from_raw(GroupKind::Fonts, raw.fonts),
            browsers: raw
                .browsers
                .list
                .unwrap_or_else(|| DEFAULT_BROWSERS.iter().map(|s| s.to_string()).collect()),
            script_target: script_target.unwrap_or_else(|| DEFAULT_SCRIPT_TARGET.to_string()),
            jpeg_quality: jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
            serve: None,
        }
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = PipelineError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let serve = raw.serve.clone().map(ServeSettings::try_from).transpose()?;
        let mut config = Config::from_raw_unchecked(raw);
        config.serve = serve;
        validate_config(&config)?;
        Ok(config)
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| "duration too large".to_string())
}
