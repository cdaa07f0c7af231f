// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod serve;
pub mod tasks;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{BuildContext, BuildMode, Config, DEFAULT_CONFIG_FILE, load_and_validate};
use crate::errors::Result;
use crate::tasks::{TaskId, default_plan, run_default, run_step};

/// High-level entry point used by `main.rs`.
///
/// Resolves the config file and project root, fixes the build mode for the
/// rest of the process, then dispatches the requested task.
pub async fn run(args: CliArgs) -> Result<()> {
    let (config_path, required) = match &args.config {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    let config = load_and_validate(&config_path, required)?;
    let root = project_root(&config_path);
    let mode = BuildMode::resolve(args.production);
    let ctx = Arc::new(BuildContext::new(root, config, mode));

    if args.dry_run {
        print_dry_run(&ctx, args.task);
        return Ok(());
    }

    info!(task = %args.task, %mode, root = ?ctx.root(), "running task");
    match args.task {
        TaskId::Default => run_default(ctx).await.map(drop),
        TaskId::Watch => watch::run_watch(ctx).await,
        TaskId::Serve => serve::run_serve(ctx).await,
        single => match single.step() {
            Some(step) => run_step(ctx, step).await.map(drop),
            None => Ok(()),
        },
    }
}

/// The config file's directory, or the working directory for a bare
/// filename like `Assetpipe.toml`.
fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_dry_run(ctx: &BuildContext, task: TaskId) {
    let config: &Config = ctx.config();
    println!("assetpipe dry-run");
    println!("  task = {task}");
    println!("  mode = {}", ctx.mode());
    println!("  root = {}", ctx.root().display());
    println!("  output = {}", config.output.display());
    println!();

    println!("groups:");
    for group in config.groups() {
        println!("  - {}", group.kind);
        println!("      src: {:?}", group.src);
        if !group.exclude.is_empty() {
            println!("      exclude: {:?}", group.exclude);
        }
        println!("      dest: {}", group.dest.display());
        if let Some(concat) = &group.concat {
            println!("      concat: {concat}");
        }
        if let Some(order) = &group.order {
            println!("      order: {:?}", order);
        }
    }
    println!("  browsers: {:?}", config.browsers);
    println!("  script target: {}", config.script_target);

    if let Some(serve) = &config.serve {
        println!();
        println!("serve:");
        println!("  cmd: {}", serve.cmd);
        println!("  watch: {:?}", serve.watch);
        println!("  {}={}", serve.env_var, ctx.mode().as_env_value());
        println!("  proxy: 127.0.0.1:{} -> {}", serve.proxy_port, serve.upstream);
    }

    println!();
    match task {
        TaskId::Default | TaskId::Serve => {
            println!("stages:");
            for (index, stage) in default_plan().iter().enumerate() {
                let names: Vec<&str> = stage.iter().map(|s| s.name()).collect();
                println!("  {}. {}", index + 1, names.join(", "));
            }
        }
        TaskId::Watch => println!("watching every group for changes"),
        other => {
            if let Some(step) = other.step() {
                println!("step: {step}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
