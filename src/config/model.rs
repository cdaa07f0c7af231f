// src/config/model.rs

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// output = "dist"
///
/// [styles]
/// src = ["src/styles/**/*.scss", "src/styles/**/*.css"]
/// dest = "styles"
/// concat = "main.css"
///
/// [scripts]
/// src = ["src/scripts/**/*.js"]
/// target = "es2015"
///
/// [serve]
/// cmd = "node server.js"
/// watch = ["server/**/*.js"]
/// ```
///
/// Every section is optional; missing values fall back to the built-in
/// layout when converted into [`crate::config::Config`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub paths: RawPaths,

    #[serde(default)]
    pub styles: RawAssetGroup,

    #[serde(default)]
    pub scripts: RawScripts,

    #[serde(default)]
    pub images: RawImages,

    #[serde(default)]
    pub fonts: RawAssetGroup,

    /// Browser support list used for vendor prefixing (`[browsers] list`).
    #[serde(default)]
    pub browsers: RawBrowsers,

    /// `[serve]` is only required by the `serve` task.
    #[serde(default)]
    pub serve: Option<RawServe>,
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPaths {
    /// Output root, relative to the project root. Destroyed by `clean`.
    #[serde(default)]
    pub output: Option<String>,
}

/// Settings shared by every asset group section. `[styles]` and `[fonts]`
/// are exactly this.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAssetGroup {
    /// Source globs, relative to the project root.
    #[serde(default)]
    pub src: Option<Vec<String>>,

    /// Globs removed from the `src` matches.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Destination directory, relative to the output root.
    #[serde(default)]
    pub dest: Option<String>,

    /// Concatenated output filename, or `false` for one output per source.
    /// Only honoured by styles and scripts.
    #[serde(default)]
    pub concat: Option<RawConcat>,

    /// Explicit source order. When present, exactly these files are used.
    #[serde(default)]
    pub order: Option<Vec<String>>,
}

/// `concat = "name.css"`, `concat = true` (default name) or `concat = false`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawConcat {
    Enabled(bool),
    File(String),
}

/// `[scripts]` section: the group keys plus the output dialect.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScripts {
    #[serde(default)]
    pub src: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub concat: Option<RawConcat>,
    #[serde(default)]
    pub order: Option<Vec<String>>,

    /// Output dialect, e.g. `"es2015"` or `"esnext"`.
    #[serde(default)]
    pub target: Option<String>,
}

impl RawScripts {
    pub fn into_parts(self) -> (RawAssetGroup, Option<String>) {
        let group = RawAssetGroup {
            src: self.src,
            exclude: self.exclude,
            dest: self.dest,
            concat: self.concat,
            order: self.order,
        };
        (group, self.target)
    }
}

/// `[images]` section: the group keys plus the JPEG quality.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawImages {
    #[serde(default)]
    pub src: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub concat: Option<RawConcat>,
    #[serde(default)]
    pub order: Option<Vec<String>>,

    /// JPEG re-encode quality (1-100).
    #[serde(default)]
    pub jpeg_quality: Option<u8>,
}

impl RawImages {
    pub fn into_parts(self) -> (RawAssetGroup, Option<u8>) {
        let group = RawAssetGroup {
            src: self.src,
            exclude: self.exclude,
            dest: self.dest,
            concat: self.concat,
            order: self.order,
        };
        (group, self.jpeg_quality)
    }
}

/// `[browsers]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBrowsers {
    #[serde(default)]
    pub list: Option<Vec<String>>,
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawServe {
    /// Shell command that starts the application server.
    pub cmd: String,

    /// Application source globs; a change restarts the server.
    #[serde(default)]
    pub watch: Vec<String>,

    /// Environment variable carrying the build mode. Defaults to `NODE_ENV`.
    #[serde(default)]
    pub env_var: Option<String>,

    /// Address the reverse proxy forwards to.
    #[serde(default)]
    pub upstream: Option<String>,

    /// Local port of the reverse proxy.
    #[serde(default)]
    pub proxy_port: Option<u16>,

    /// Regex matched against server stdout; the first match marks it started.
    #[serde(default)]
    pub ready_pattern: Option<String>,

    /// Duration string (e.g. `"2s"`) after which the server counts as started.
    #[serde(default)]
    pub ready_after: Option<String>,
}
