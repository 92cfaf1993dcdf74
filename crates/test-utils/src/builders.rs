#![allow(dead_code)]

use taskwatch::config::{ConfigFile, RawConfigFile, TaskConfig, WatchRule};
use taskwatch::types::Pattern;
use taskwatch::watch::WatchOptions;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.config.options.set(key, value);
        self
    }

    pub fn with_watch(mut self, rule: WatchRule) -> Self {
        self.config.watch.push(rule);
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                after: vec![],
            },
        }
    }

    /// A task without a command.
    pub fn group() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `WatchRule`.
pub struct WatchRuleBuilder {
    rule: WatchRule,
}

impl WatchRuleBuilder {
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        Self {
            rule: WatchRule {
                pattern: pattern.into(),
                options: None,
                tasks: vec![],
            },
        }
    }

    pub fn task(mut self, name: &str) -> Self {
        self.rule.tasks.push(name.to_string());
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.rule
            .options
            .get_or_insert_with(WatchOptions::new)
            .set(key, value);
        self
    }

    pub fn build(self) -> WatchRule {
        self.rule
    }
}
