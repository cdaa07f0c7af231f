// src/tasks/styles.rs

//! Style pipeline: SASS compile -> concatenate -> prefix -> print.
//!
//! `.scss` sources go through `grass`; everything else is read as plain CSS.
//! The compiled sheets are merged into one `lightningcss` stylesheet so the
//! printer can emit a single source map that points back at every input.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use lightningcss::rules::CssRuleList;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use tracing::{debug, info};

use crate::config::{BuildContext, BuildMode, GroupKind};
use crate::errors::{PipelineError, Result};
use crate::tasks::output::write_output;
use crate::tasks::registry::BuildStep;
use crate::tasks::report::TaskReport;
use crate::tasks::sources::{SourceFile, collect_group_sources};

/// One source after preprocessing, ready for the CSS parser.
#[derive(Debug, Clone)]
pub struct CompiledStyle {
    /// Root-relative name, used in diagnostics and the source map.
    pub name: String,
    pub css: String,
}

/// Printed stylesheet plus its source map (development only).
#[derive(Debug, Clone)]
pub struct StyleOutput {
    pub code: String,
    pub map: Option<String>,
}

/// Compile the styles group into its destination.
pub async fn compile_styles(ctx: Arc<BuildContext>) -> Result<TaskReport> {
    let sources: Vec<SourceFile> = collect_group_sources(&ctx, GroupKind::Styles)?
        .into_iter()
        .filter(|s| !is_partial(&s.path))
        .collect();

    let mut report = TaskReport::new(BuildStep::Styles);
    if sources.is_empty() {
        info!("no style sources matched");
        return Ok(report);
    }

    let dest = ctx.dest_dir(GroupKind::Styles);
    let concat = ctx.group(GroupKind::Styles).concat.clone();
    let browsers = ctx.config().browsers.clone();
    let mode = ctx.mode();

    let files = tokio::task::spawn_blocking(move || {
        render_styles(&sources, concat.as_deref(), &browsers, mode, &dest)
    })
    .await
    .context("style compiler task panicked")??;

    for (path, contents) in files {
        report.outputs.push(write_output(&path, contents.as_bytes()).await?);
    }

    report.log_summary();
    Ok(report)
}

/// Render the whole group to `(output path, contents)` pairs.
fn render_styles(
    sources: &[SourceFile],
    concat: Option<&str>,
    browsers: &[String],
    mode: BuildMode,
    dest: &Path,
) -> Result<Vec<(PathBuf, String)>> {
    let compiled = sources
        .iter()
        .map(preprocess)
        .collect::<Result<Vec<_>>>()?;

    let mut files = Vec::new();
    match concat {
        Some(name) => {
            let output = process_stylesheet(&compiled, browsers, mode, name)?;
            push_outputs(&mut files, dest.join(name), output);
        }
        None => {
            for (source, style) in sources.iter().zip(compiled) {
                let target = dest.join(&source.base_rel).with_extension("css");
                let file_name = target
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "style.css".to_string());
                let output =
                    process_stylesheet(std::slice::from_ref(&style), browsers, mode, &file_name)?;
                push_outputs(&mut files, target, output);
            }
        }
    }
    Ok(files)
}

fn push_outputs(files: &mut Vec<(PathBuf, String)>, target: PathBuf, output: StyleOutput) {
    if let Some(map) = output.map {
        let mut map_path = target.clone().into_os_string();
        map_path.push(".map");
        files.push((PathBuf::from(map_path), map));
    }
    files.push((target, output.code));
}

/// Partials (`_name.scss`) are only ever imported, never compiled directly.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Run the preprocessor if the source needs one.
pub fn preprocess(source: &SourceFile) -> Result<CompiledStyle> {
    let is_scss = source
        .path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("scss"));

    let css = if is_scss {
        let options = grass::Options::default().style(grass::OutputStyle::Expanded);
        grass::from_path(&source.path, &options).map_err(|e| PipelineError::StyleCompile {
            file: source.rel.clone(),
            message: e.to_string(),
        })?
    } else {
        std::fs::read_to_string(&source.path)
            .with_context(|| format!("reading style source {:?}", source.path))?
    };

    debug!(source = %source.rel, bytes = css.len(), "preprocessed style source");
    Ok(CompiledStyle {
        name: source.rel.clone(),
        css,
    })
}

/// Resolve a browserslist query into prefixing targets.
pub fn browser_targets(browsers: &[String]) -> Result<Targets> {
    let resolved = Browsers::from_browserslist(browsers.iter().map(String::as_str))
        .map_err(|e| anyhow!("resolving browser list: {e}"))?;
    Ok(resolved.map(Targets::from).unwrap_or_default())
}

/// Concatenate, prefix and print a set of compiled styles.
///
/// Inputs keep their order. `output_name` is the file the result will be
/// written as; in development it names the map in `sourceMappingURL`.
pub fn process_stylesheet(
    inputs: &[CompiledStyle],
    browsers: &[String],
    mode: BuildMode,
    output_name: &str,
) -> Result<StyleOutput> {
    let targets = browser_targets(browsers)?;

    let mut sources = Vec::with_capacity(inputs.len());
    let mut rules = Vec::new();
    for (index, input) in inputs.iter().enumerate() {
        let options = ParserOptions {
            filename: input.name.clone(),
            source_index: index as u32,
            ..ParserOptions::default()
        };
        let sheet = StyleSheet::parse(&input.css, options).map_err(|e| {
            PipelineError::StyleCompile {
                file: input.name.clone(),
                message: e.to_string(),
            }
        })?;
        sources.push(input.name.clone());
        rules.extend(sheet.rules.0);
    }

    let mut sheet = StyleSheet::new(sources, CssRuleList(rules), ParserOptions::default());
    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| PipelineError::StyleCompile {
            file: output_name.to_string(),
            message: e.to_string(),
        })?;

    let mut source_map = match mode {
        BuildMode::Production => None,
        BuildMode::Development => {
            let mut map = SourceMap::new("/");
            for (index, input) in inputs.iter().enumerate() {
                map.add_source(&input.name);
                map.set_source_content(index, &input.css)
                    .map_err(|e| anyhow!("recording source content for {}: {e:?}", input.name))?;
            }
            Some(map)
        }
    };

    let printed = sheet
        .to_css(PrinterOptions {
            minify: mode.is_production(),
            source_map: source_map.as_mut(),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| PipelineError::StyleCompile {
            file: output_name.to_string(),
            message: e.to_string(),
        })?;

    let mut code = printed.code;
    let map = match source_map {
        Some(mut map) => {
            let json = map
                .to_json(None)
                .map_err(|e| anyhow!("serializing source map for {output_name}: {e:?}"))?;
            code.push_str(&format!("\n/*# sourceMappingURL={output_name}.map */\n"));
            Some(json)
        }
        None => None,
    };

    Ok(StyleOutput { code, map })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(name: &str, css: &str) -> CompiledStyle {
        CompiledStyle {
            name: name.to_string(),
            css: css.to_string(),
        }
    }

    fn safari() -> Vec<String> {
        vec!["safari 10".to_string()]
    }

    #[test]
    fn inputs_keep_their_order() -> Result<()> {
        let out = process_stylesheet(
            &[style("a.css", ".first { color: red }"), style("b.css", ".second { color: blue }")],
            &safari(),
            BuildMode::Production,
            "main.css",
        )?;
        let first = out.code.find(".first").expect("first rule present");
        let second = out.code.find(".second").expect("second rule present");
        assert!(first < second);
        Ok(())
    }

    #[test]
    fn vendor_prefixes_follow_the_browser_list() -> Result<()> {
        let out = process_stylesheet(
            &[style("a.css", ".a { user-select: none }")],
            &safari(),
            BuildMode::Production,
            "main.css",
        )?;
        assert!(out.code.contains("-webkit-user-select"), "{}", out.code);
        Ok(())
    }

    #[test]
    fn development_emits_a_map_and_production_does_not() -> Result<()> {
        let inputs = [style("a.css", ".a {\n  color: red;\n}\n")];

        let dev = process_stylesheet(&inputs, &safari(), BuildMode::Development, "main.css")?;
        let map = dev.map.expect("development output has a map");
        assert!(map.contains("a.css"));
        assert!(dev.code.contains("sourceMappingURL=main.css.map"));

        let prod = process_stylesheet(&inputs, &safari(), BuildMode::Production, "main.css")?;
        assert!(prod.map.is_none());
        assert!(!prod.code.contains("sourceMappingURL"));
        assert!(prod.code.len() <= dev.code.len());
        Ok(())
    }

    #[test]
    fn partials_are_detected_by_leading_underscore() {
        assert!(is_partial(Path::new("src/styles/_vars.scss")));
        assert!(!is_partial(Path::new("src/styles/main.scss")));
    }
}
