// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod host;
pub mod logging;
pub mod plugin;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::host::{App, Task};
use crate::plugin::{WatchExt, WatchPlugin, WatchRequest};
use crate::types::BuildTarget;
use crate::watch::{FsWatcher, WatchOptions};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, registers its tasks on an [`App`], installs the watch
/// plugin, then either builds once or watches until Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let root_dir = config_root_dir(&config_path);
    let app = app_from_config(&cfg, &root_dir)?;

    if args.once {
        for (index, rule) in cfg.watch.iter().enumerate() {
            if rule.tasks.is_empty() {
                continue;
            }
            info!(rule = index + 1, tasks = ?rule.tasks, "building");
            app.run_build(vec![BuildTarget::Tasks(rule.tasks.clone())])
                .await?;
        }
        return Ok(());
    }

    let mut watchers = Vec::with_capacity(cfg.watch.len());
    for rule in cfg.watch.iter() {
        let mut request = WatchRequest::new(rule.pattern.clone());
        if let Some(overrides) = &rule.options {
            request = request.options(anchor_cwd(overrides.clone(), &root_dir));
        }
        if !rule.tasks.is_empty() {
            request = request.tasks(rule.tasks.iter().cloned());
        }

        let watcher = app.watch_request(request)?;
        if rule.tasks.is_empty() {
            log_changes(&watcher);
        }
        watchers.push(watcher);
    }

    if watchers.is_empty() {
        warn!("no [[watch]] rules configured, nothing to do");
        return Ok(());
    }

    info!(watchers = watchers.len(), "watching; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    for watcher in watchers.iter_mut() {
        watcher.close();
    }
    Ok(())
}

/// Build an [`App`] with every configured task and the watch plugin.
///
/// Default options get `cwd = root_dir` unless they set their own; a relative
/// `cwd` is taken relative to `root_dir`.
pub fn app_from_config(cfg: &ConfigFile, root_dir: &Path) -> errors::Result<App> {
    let app = App::new();

    for (name, task_cfg) in cfg.task.iter() {
        let mut task = match &task_cfg.cmd {
            Some(cmd) => Task::command(cmd.clone()),
            None => Task::group(Vec::<String>::new()),
        };
        for dep in task_cfg.after.iter() {
            task = task.after(dep.clone());
        }
        app.task(name.clone(), task);
    }

    let mut defaults = anchor_cwd(cfg.options.clone(), root_dir);
    if !defaults.contains_key("cwd") {
        defaults.set("cwd", root_dir.to_string_lossy().into_owned());
    }
    app.use_plugin(WatchPlugin::new(defaults))?;

    Ok(app)
}

fn anchor_cwd(mut options: WatchOptions, root_dir: &Path) -> WatchOptions {
    let relative = options
        .get("cwd")
        .and_then(|v| v.as_str())
        .filter(|cwd| Path::new(cwd).is_relative())
        .map(|cwd| root_dir.join(cwd));
    if let Some(path) = relative {
        options.set("cwd", path.to_string_lossy().into_owned());
    }
    options
}

fn log_changes(watcher: &FsWatcher) {
    watcher.on_all(|event| {
        info!(kind = %event.kind, path = %event.path.display(), "file changed");
    });
}

/// The config file's directory, or the current directory for a bare file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_dry_run(cfg: &ConfigFile) {
    println!("taskwatch dry-run");

    if !cfg.options.is_empty() {
        println!("options:");
        for key in cfg.options.keys() {
            if let Some(value) = cfg.options.get(key) {
                println!("  {key} = {value}");
            }
        }
    }
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        if let Some(ref cmd) = task.cmd {
            println!("      cmd: {cmd}");
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
    }
    println!();

    println!("watch rules ({}):", cfg.watch.len());
    for rule in cfg.watch.iter() {
        println!("  - {}", rule.pattern);
        if let Some(ref options) = rule.options {
            let keys: Vec<&str> = options.keys().collect();
            println!("      options: {keys:?}");
        }
        if !rule.tasks.is_empty() {
            println!("      tasks: {:?}", rule.tasks);
        }
    }

    debug!("dry-run complete (no execution)");
}
