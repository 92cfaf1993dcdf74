// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::TaskGraph;
use crate::errors::{Result, TaskwatchError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_options(cfg)?;
    validate_task_graph(cfg)?;
    validate_watch_rules(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskwatchError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_options(cfg: &RawConfigFile) -> Result<()> {
    cfg.options.resolve()?;
    for (index, rule) in cfg.watch.iter().enumerate() {
        if let Some(overrides) = &rule.options {
            cfg.options.merged(overrides).resolve().map_err(|e| {
                TaskwatchError::ConfigError(format!("[[watch]] #{}: {}", index + 1, e))
            })?;
        }
    }
    Ok(())
}

fn validate_task_graph(cfg: &RawConfigFile) -> Result<()> {
    let graph = TaskGraph::from_tasks(
        cfg.task
            .iter()
            .map(|(name, task)| (name.as_str(), task.after.as_slice())),
    );
    graph.validate()
}

fn validate_watch_rules(cfg: &RawConfigFile) -> Result<()> {
    for (index, rule) in cfg.watch.iter().enumerate() {
        if rule.pattern.is_empty() {
            return Err(TaskwatchError::ConfigError(format!(
                "[[watch]] #{} has an empty pattern",
                index + 1
            )));
        }
        for task in rule.tasks.iter() {
            if !cfg.task.contains_key(task) {
                return Err(TaskwatchError::ConfigError(format!(
                    "[[watch]] #{} references unknown task '{}'",
                    index + 1,
                    task
                )));
            }
        }
    }
    Ok(())
}
