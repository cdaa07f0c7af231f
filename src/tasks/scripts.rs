// src/tasks/scripts.rs

//! Script pipeline: lint -> transform to the target dialect -> concatenate,
//! minified in production and source-mapped in development.
//!
//! Lint findings never fail the step; syntax and transform errors do.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::{Scoping, SemanticBuilder};
use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap};
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};
use tracing::{debug, info, warn};

use crate::config::{BuildContext, BuildMode, GroupKind};
use crate::errors::{PipelineError, Result};
use crate::tasks::output::write_output;
use crate::tasks::registry::BuildStep;
use crate::tasks::report::TaskReport;
use crate::tasks::sources::{SourceFile, collect_group_sources};

/// One source after lint + transform + codegen.
#[derive(Debug)]
pub struct CompiledScript {
    pub name: String,
    pub code: String,
    pub map: Option<SourceMap>,
    pub diagnostics: Vec<String>,
}

/// Files to write plus every lint finding of the run.
#[derive(Debug, Default)]
struct ScriptOutputs {
    files: Vec<(PathBuf, String)>,
    diagnostics: Vec<String>,
}

/// Compile the scripts group into its destination.
pub async fn compile_scripts(ctx: Arc<BuildContext>) -> Result<TaskReport> {
    let sources = collect_group_sources(&ctx, GroupKind::Scripts)?;
    let mut report = TaskReport::new(BuildStep::Scripts);
    if sources.is_empty() {
        info!("no script sources matched");
        return Ok(report);
    }

    let dest = ctx.dest_dir(GroupKind::Scripts);
    let concat = ctx.group(GroupKind::Scripts).concat.clone();
    let target = ctx.config().script_target.clone();
    let mode = ctx.mode();

    let outputs = tokio::task::spawn_blocking(move || {
        render_scripts(&sources, concat.as_deref(), &target, mode, &dest)
    })
    .await
    .context("script compiler task panicked")??;

    for diagnostic in &outputs.diagnostics {
        warn!(task = "scripts", "lint: {diagnostic}");
    }
    report.diagnostics = outputs.diagnostics;

    for (path, contents) in outputs.files {
        report.outputs.push(write_output(&path, contents.as_bytes()).await?);
    }

    report.log_summary();
    Ok(report)
}

fn render_scripts(
    sources: &[SourceFile],
    concat: Option<&str>,
    target: &str,
    mode: BuildMode,
    dest: &Path,
) -> Result<ScriptOutputs> {
    let options = TransformOptions::from_target(target)
        .map_err(|e| PipelineError::ConfigError(format!("[scripts].target: {e}")))?;

    let mut compiled = Vec::with_capacity(sources.len());
    for source in sources {
        let text = std::fs::read_to_string(&source.path)
            .with_context(|| format!("reading script source {:?}", source.path))?;
        compiled.push(compile_script(&source.rel, &source.path, &text, &options, mode)?);
    }

    let mut outputs = ScriptOutputs::default();
    for script in &mut compiled {
        outputs.diagnostics.append(&mut script.diagnostics);
    }

    match concat {
        Some(name) => {
            let (code, map) = concatenate(&compiled, name)?;
            push_outputs(&mut outputs.files, dest.join(name), code, map);
        }
        None => {
            for (source, script) in sources.iter().zip(compiled) {
                let target = dest.join(&source.base_rel).with_extension("js");
                let file_name = target
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "script.js".to_string());
                let (code, map) = concatenate(std::slice::from_ref(&script), &file_name)?;
                push_outputs(&mut outputs.files, target, code, map);
            }
        }
    }

    Ok(outputs)
}

fn push_outputs(
    files: &mut Vec<(PathBuf, String)>,
    target: PathBuf,
    code: String,
    map: Option<String>,
) {
    if let Some(map) = map {
        let mut map_path = target.clone().into_os_string();
        map_path.push(".map");
        files.push((PathBuf::from(map_path), map));
    }
    files.push((target, code));
}

/// Lint, transform and print a single script.
pub fn compile_script(
    name: &str,
    path: &Path,
    source: &str,
    options: &TransformOptions,
    mode: BuildMode,
) -> Result<CompiledScript> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::mjs());

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        return Err(PipelineError::ScriptCompile {
            file: name.to_string(),
            message: join_messages(parsed.errors.iter()),
        });
    }
    let mut program = parsed.program;

    let checked = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&program);
    let mut diagnostics: Vec<String> = checked
        .errors
        .iter()
        .map(|e| format!("{name}: {e}"))
        .collect();
    diagnostics.extend(
        unused_bindings(checked.semantic.scoping())
            .into_iter()
            .map(|binding| format!("{name}: '{binding}' is declared but never used")),
    );
    let scoping = checked.semantic.into_scoping();

    let transformed =
        Transformer::new(&allocator, path, options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(PipelineError::ScriptCompile {
            file: name.to_string(),
            message: join_messages(transformed.errors.iter()),
        });
    }

    let (code, map) = match mode {
        BuildMode::Production => {
            let minified = Minifier::new(MinifierOptions {
                mangle: Some(MangleOptions::default()),
                compress: Some(CompressOptions::smallest()),
            })
            .minify(&allocator, &mut program);
            let code = Codegen::new()
                .with_options(CodegenOptions {
                    minify: true,
                    comments: CommentOptions::disabled(),
                    ..CodegenOptions::default()
                })
                .with_scoping(minified.scoping)
                .build(&program)
                .code;
            (code, None)
        }
        BuildMode::Development => {
            let printed = Codegen::new()
                .with_options(CodegenOptions {
                    source_map_path: Some(PathBuf::from(name)),
                    ..CodegenOptions::default()
                })
                .build(&program);
            (printed.code, printed.map)
        }
    };

    debug!(source = %name, bytes = code.len(), "compiled script");
    Ok(CompiledScript {
        name: name.to_string(),
        code,
        map,
        diagnostics,
    })
}

/// Bindings declared below the top level that are never read.
///
/// Top-level names are skipped; with concatenation they are routinely used
/// by a later file.
fn unused_bindings(scoping: &Scoping) -> Vec<String> {
    let root = scoping.root_scope_id();
    scoping
        .symbol_ids()
        .filter(|&id| scoping.symbol_scope_id(id) != root)
        .filter(|&id| scoping.get_resolved_reference_ids(id).is_empty())
        .map(|id| scoping.symbol_name(id).to_string())
        .collect()
}

fn join_messages<E: std::fmt::Display>(errors: impl Iterator<Item = E>) -> String {
    errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

/// Join compiled scripts, newline separated, merging their maps.
fn concatenate(scripts: &[CompiledScript], output_name: &str) -> Result<(String, Option<String>)> {
    let mut code = String::new();
    let mut line_offsets = Vec::with_capacity(scripts.len());
    let mut lines: u32 = 0;

    for script in scripts {
        line_offsets.push(lines);
        code.push_str(&script.code);
        if !script.code.ends_with('\n') {
            code.push('\n');
        }
        lines = code.matches('\n').count() as u32;
    }

    let maps: Vec<(&SourceMap, u32)> = scripts
        .iter()
        .zip(&line_offsets)
        .filter_map(|(script, offset)| script.map.as_ref().map(|m| (m, *offset)))
        .collect();

    if maps.is_empty() {
        return Ok((code, None));
    }

    let merged = ConcatSourceMapBuilder::from_sourcemaps(&maps).into_sourcemap();
    code.push_str(&format!("//# sourceMappingURL={output_name}.map\n"));
    Ok((code, Some(merged.to_json_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn es2015() -> TransformOptions {
        TransformOptions::from_target("es2015").expect("es2015 is a known target")
    }

    fn compile(src: &str, mode: BuildMode) -> Result<CompiledScript> {
        compile_script("src/scripts/app.js", Path::new("src/scripts/app.js"), src, &es2015(), mode)
    }

    #[test]
    fn syntax_errors_fail_the_file() {
        let err = compile("function (", BuildMode::Development).unwrap_err();
        assert!(err.to_string().contains("src/scripts/app.js"), "{err}");
    }

    #[test]
    fn unused_locals_are_reported_but_not_fatal() -> Result<()> {
        let out = compile(
            "export function greet(name) { const unused = 1; return 'hi ' + name; }\n",
            BuildMode::Development,
        )?;
        assert!(
            out.diagnostics.iter().any(|d| d.contains("'unused'")),
            "{:?}",
            out.diagnostics
        );
        assert!(out.code.contains("greet"));
        Ok(())
    }

    #[test]
    fn production_is_minified_without_map() -> Result<()> {
        let src = "export function add(first, second) {\n  // sum\n  return first + second;\n}\n";
        let dev = compile(src, BuildMode::Development)?;
        let prod = compile(src, BuildMode::Production)?;

        assert!(dev.map.is_some());
        assert!(prod.map.is_none());
        assert!(prod.code.len() < dev.code.len());
        assert!(!prod.code.contains("// sum"));
        Ok(())
    }

    #[test]
    fn concatenation_keeps_order_and_points_at_each_source() -> Result<()> {
        let a = compile_script("a.js", Path::new("a.js"), "export const alpha = 1;\n", &es2015(), BuildMode::Development)?;
        let b = compile_script("b.js", Path::new("b.js"), "export const beta = 2;\n", &es2015(), BuildMode::Development)?;

        let (code, map) = concatenate(&[a, b], "main.js")?;
        let alpha = code.find("alpha").expect("alpha present");
        let beta = code.find("beta").expect("beta present");
        assert!(alpha < beta);
        assert!(code.ends_with("//# sourceMappingURL=main.js.map\n"));

        let map = map.expect("development concat has a map");
        assert!(map.contains("a.js") && map.contains("b.js"), "{map}");
        Ok(())
    }
}
