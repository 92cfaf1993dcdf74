// src/plugin/registrar.rs

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::errors::Result;
use crate::host::TaskHost;
use crate::plugin::args::WatchRequest;
use crate::plugin::gate::{BuildGate, Release};
use crate::types::BuildTarget;
use crate::watch::{create_watcher, FsWatcher, WatchOptions};

/// The `watch` capability: creates watchers and wires them to builds.
#[derive(Debug, Clone, Default)]
pub struct Registrar {
    defaults: WatchOptions,
}

impl Registrar {
    pub fn new(defaults: WatchOptions) -> Self {
        Self { defaults }
    }

    /// Process-wide default options, fixed at installation.
    pub fn defaults(&self) -> &WatchOptions {
        &self.defaults
    }

    /// Defaults with `overrides` merged on top.
    pub fn resolve_options(&self, overrides: Option<&WatchOptions>) -> WatchOptions {
        match overrides {
            Some(overrides) => self.defaults.merged(overrides),
            None => self.defaults.clone(),
        }
    }

    /// Start a watcher for `request`.
    ///
    /// Without targets the watcher is returned untouched. With targets, every
    /// change event starts a build on `host` unless one is already running.
    pub fn watch(&self, host: Arc<dyn TaskHost>, request: WatchRequest) -> Result<FsWatcher> {
        let options = self.resolve_options(request.options.as_ref());
        let settings = options.resolve()?;
        let watcher = create_watcher(&request.pattern, &settings)?;

        if !request.has_targets() {
            debug!(pattern = %request.pattern, "watch registered without targets");
            return Ok(watcher);
        }

        debug!(
            pattern = %request.pattern,
            targets = ?request.targets,
            "watch registered with build trigger"
        );
        attach_build_trigger(&watcher, host, request.targets);
        Ok(watcher)
    }
}

/// Attach the `ready` and `all` listeners that drive builds of `targets`.
///
/// Returns the gate so callers can observe the trigger's state.
pub fn attach_build_trigger(
    watcher: &FsWatcher,
    host: Arc<dyn TaskHost>,
    targets: Vec<BuildTarget>,
) -> Arc<BuildGate> {
    let gate = Arc::new(BuildGate::new());

    {
        let gate = Arc::clone(&gate);
        watcher.on_ready(move || gate.mark_ready());
    }

    {
        let gate = Arc::clone(&gate);
        watcher.on_all(move |event| {
            if !gate.try_begin() {
                debug!(kind = %event.kind, path = ?event.path, "build in progress, event dropped");
                return;
            }

            info!(kind = %event.kind, path = ?event.path, "change detected, starting build");
            let gate = Arc::clone(&gate);
            let host = Arc::clone(&host);
            let targets = targets.clone();

            tokio::spawn(async move {
                let _release = Release(&gate);
                let started = Instant::now();
                match host.build(targets).await {
                    Ok(()) => info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "build finished"
                    ),
                    Err(err) => error!(error = %err, "build failed"),
                }
            });
        });
    }

    gate
}
