// src/watch/options.rs

//! Watcher options: an untyped table that can be layered (process-wide
//! defaults, then per-call overrides) and resolved into typed
//! [`WatcherSettings`] once the layers are merged.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{Result, TaskwatchError};
use crate::types::Pattern;

/// Keys understood by [`WatcherSettings`]. Anything else is carried along
/// untouched and ignored at resolution time.
pub const KNOWN_OPTION_KEYS: &[&str] = &[
    "cwd",
    "ignore_initial",
    "ignored",
    "depth",
    "use_polling",
    "interval",
    "follow_symlinks",
];

/// Mapping of option name to watcher-specific value.
///
/// ```toml
/// [options]
/// cwd = "site"
/// ignore_initial = true
/// ignored = ["**/*.tmp"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct WatchOptions(toml::Table);

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Shallow key-wise merge: every key of `overrides` replaces the key of
    /// the same name in `self`; nested tables are replaced wholesale.
    pub fn merged(&self, overrides: &WatchOptions) -> WatchOptions {
        let mut table = self.0.clone();
        for (key, value) in overrides.0.iter() {
            table.insert(key.clone(), value.clone());
        }
        WatchOptions(table)
    }

    /// Convert the table into typed settings.
    pub fn resolve(&self) -> Result<WatcherSettings> {
        for key in self.keys() {
            if !KNOWN_OPTION_KEYS.contains(&key) {
                debug!(option = %key, "ignoring unrecognised watch option");
            }
        }

        toml::Value::Table(self.0.clone())
            .try_into::<WatcherSettings>()
            .map_err(|e| TaskwatchError::ConfigError(format!("invalid watch options: {e}")))
    }
}

impl From<toml::Table> for WatchOptions {
    fn from(table: toml::Table) -> Self {
        WatchOptions(table)
    }
}

/// Typed, resolved watcher configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    /// Base directory for relative patterns. When set, event paths are
    /// reported relative to it.
    pub cwd: Option<PathBuf>,
    /// Skip `add`/`add_dir` events for entries found by the initial scan.
    pub ignore_initial: bool,
    /// Globs for paths that are never reported.
    pub ignored: Pattern,
    /// Maximum number of directory levels reported below a watched directory.
    pub depth: Option<usize>,
    /// Use a polling watcher instead of the native backend.
    pub use_polling: bool,
    /// Poll interval in milliseconds (only with `use_polling`).
    pub interval: u64,
    /// Follow symbolic links when watching and scanning directories.
    pub follow_symlinks: bool,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            cwd: None,
            ignore_initial: false,
            ignored: Pattern::default(),
            depth: None,
            use_polling: false,
            interval: 100,
            follow_symlinks: true,
        }
    }
}
