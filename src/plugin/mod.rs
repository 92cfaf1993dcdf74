// src/plugin/mod.rs

//! The watch plugin.
//!
//! Installing [`WatchPlugin`] on an [`App`] attaches a [`Registrar`] under the
//! `watch` capability. [`WatchExt`] gives the app a `watch` method that reaches
//! it.

pub mod args;
pub mod gate;
pub mod registrar;

use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{Result, TaskwatchError};
use crate::host::{App, Plugin};
use crate::types::Pattern;
use crate::watch::{FsWatcher, WatchOptions};

pub use args::{WatchArg, WatchRequest};
pub use gate::{BuildGate, GateState};
pub use registrar::{attach_build_trigger, Registrar};

/// Registration marker set on an app once the plugin is installed.
pub const PLUGIN_NAME: &str = "taskwatch";

/// Capability name the registrar is defined under.
pub const WATCH_CAPABILITY: &str = "watch";

/// Installs the `watch` capability, with `defaults` as the process-wide
/// watcher options.
#[derive(Debug, Clone, Default)]
pub struct WatchPlugin {
    defaults: WatchOptions,
}

impl WatchPlugin {
    pub fn new(defaults: WatchOptions) -> Self {
        Self { defaults }
    }
}

impl Plugin for WatchPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn install(&self, app: &App) -> Result<()> {
        if app.is_registered(PLUGIN_NAME) {
            debug!("watch plugin already installed");
            return Ok(());
        }

        self.defaults.resolve()?;

        if !app.mark_registered(PLUGIN_NAME) {
            return Ok(());
        }
        app.define(WATCH_CAPABILITY, Arc::new(Registrar::new(self.defaults.clone())));
        info!(defaults = ?self.defaults.keys().collect::<Vec<_>>(), "watch plugin installed");
        Ok(())
    }
}

/// `watch` on an [`App`] with the plugin installed.
pub trait WatchExt {
    /// Variadic form: `args` may start with an options table, everything
    /// else is forwarded to the build.
    fn watch(&self, pattern: impl Into<Pattern>, args: Vec<WatchArg>) -> Result<FsWatcher>;

    fn watch_request(&self, request: WatchRequest) -> Result<FsWatcher>;
}

impl WatchExt for App {
    fn watch(&self, pattern: impl Into<Pattern>, args: Vec<WatchArg>) -> Result<FsWatcher> {
        self.watch_request(WatchRequest::from_args(pattern, args))
    }

    fn watch_request(&self, request: WatchRequest) -> Result<FsWatcher> {
        let registrar = self
            .capability::<Registrar>(WATCH_CAPABILITY)
            .ok_or(TaskwatchError::NotInstalled)?;
        registrar.watch(Arc::new(self.clone()), request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent() {
        let app = App::new();
        app.use_plugin(WatchPlugin::new(WatchOptions::new().with("depth", 3)))
            .unwrap();
        app.use_plugin(WatchPlugin::new(WatchOptions::new().with("depth", 9)))
            .unwrap();

        assert_eq!(app.capability_names(), vec![WATCH_CAPABILITY.to_string()]);
        let registrar = app.capability::<Registrar>(WATCH_CAPABILITY).unwrap();
        assert_eq!(
            registrar.defaults().get("depth").and_then(|v| v.as_integer()),
            Some(3)
        );
    }

    #[test]
    fn invalid_defaults_are_rejected_without_marking() {
        let app = App::new();
        let err = app
            .use_plugin(WatchPlugin::new(WatchOptions::new().with("depth", "deep")))
            .unwrap_err();

        assert!(matches!(err, TaskwatchError::ConfigError(_)));
        assert!(!app.is_registered(PLUGIN_NAME));
        assert!(!app.has_capability(WATCH_CAPABILITY));
    }

    #[test]
    fn watch_without_plugin_fails() {
        let app = App::new();
        assert!(matches!(
            app.watch("a.txt", vec!["build".into()]),
            Err(TaskwatchError::NotInstalled)
        ));
    }
}
