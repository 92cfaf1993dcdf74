// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::Pattern;
use crate::watch::WatchOptions;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [options]
/// ignore_initial = true
/// ignored = ["**/target/**"]
///
/// [task.fmt]
/// cmd = "cargo fmt"
///
/// [task.build]
/// cmd = "cargo build"
/// after = ["fmt"]
///
/// [[watch]]
/// pattern = ["src/**/*.rs", "Cargo.toml"]
/// tasks = ["build"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Default watcher options from `[options]`.
    #[serde(default)]
    pub options: WatchOptions,

    /// Tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Rules from `[[watch]]`, in file order.
    #[serde(default)]
    pub watch: Vec<WatchRule>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Shell command. A task without one only groups its dependencies.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Tasks that must finish first.
    #[serde(default)]
    pub after: Vec<String>,
}

/// One `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRule {
    pub pattern: Pattern,

    /// Overrides merged on top of `[options]`.
    #[serde(default)]
    pub options: Option<WatchOptions>,

    /// Tasks built when a matching file changes. Empty means the rule only
    /// logs changes.
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Validated configuration. Obtain one through `TryFrom<RawConfigFile>` or
/// [`load_and_validate`](super::load_and_validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub options: WatchOptions,
    pub task: BTreeMap<String, TaskConfig>,
    pub watch: Vec<WatchRule>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            options: raw.options,
            task: raw.task,
            watch: raw.watch,
        }
    }
}
