// src/host/mod.rs

//! The plugin-composable application object.
//!
//! An [`App`] owns:
//! - a set of registration markers, so plugins can make installation
//!   idempotent;
//! - named capabilities attached by plugins (`define`);
//! - a task registry and the `build` operation that runs tasks.
//!
//! Plugins reach the build operation through the [`TaskHost`] trait, which
//! lets tests substitute a fake host.

pub mod task;

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::dag::TaskGraph;
use crate::errors::{Result, TaskwatchError};
use crate::exec::run_command;
use crate::types::{BuildTarget, TaskName};

pub use task::{Task, TaskAction};

type Capability = Arc<dyn Any + Send + Sync>;

/// Something that can run builds.
pub trait TaskHost: Send + Sync {
    /// Run `targets` in series. The returned future resolves once, when every
    /// target has finished or the first one has failed.
    fn build(
        &self,
        targets: Vec<BuildTarget>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// A unit of functionality installed into an [`App`].
pub trait Plugin {
    fn name(&self) -> &str;
    fn install(&self, app: &App) -> Result<()>;
}

#[derive(Default)]
struct AppInner {
    registered: Mutex<HashSet<String>>,
    capabilities: RwLock<HashMap<String, Capability>>,
    tasks: RwLock<BTreeMap<TaskName, Task>>,
}

/// Application handle. Cloning is cheap and clones share state.
#[derive(Clone, Default)]
pub struct App {
    inner: Arc<AppInner>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("capabilities", &self.capability_names())
            .field("tasks", &self.task_names())
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a plugin.
    pub fn use_plugin<P: Plugin>(&self, plugin: P) -> Result<&Self> {
        debug!(plugin = %plugin.name(), "installing plugin");
        plugin.install(self)?;
        Ok(self)
    }

    /// Whether a registration marker with this name exists.
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Set a registration marker. Returns false if it was already set.
    pub fn mark_registered(&self, name: &str) -> bool {
        self.inner
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string())
    }

    /// Attach a named capability, replacing any previous one of that name.
    pub fn define<T: Any + Send + Sync>(&self, name: &str, capability: Arc<T>) {
        let previous = self
            .inner
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), capability);
        if previous.is_some() {
            warn!(capability = %name, "capability redefined");
        } else {
            debug!(capability = %name, "capability defined");
        }
    }

    /// Look up a capability by name and type.
    pub fn capability<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let cap = self
            .inner
            .capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;
        cap.downcast::<T>().ok()
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.inner
            .capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Capability names, sorted.
    pub fn capability_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Register (or replace) a task.
    pub fn task(&self, name: impl Into<TaskName>, task: Task) -> &Self {
        let name = name.into();
        debug!(task = %name, deps = ?task.deps(), "registering task");
        self.inner
            .tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, task);
        self
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.inner
            .tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Task names, sorted.
    pub fn task_names(&self) -> Vec<TaskName> {
        self.inner
            .tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Run `targets` in series.
    ///
    /// Named tasks run after their dependencies; within one build each task
    /// runs at most once. Stops at the first failure.
    pub async fn run_build(&self, targets: Vec<BuildTarget>) -> Result<()> {
        let mut done: HashSet<TaskName> = HashSet::new();

        for target in targets {
            match target {
                BuildTarget::Task(name) => self.run_named(&[name], &mut done).await?,
                BuildTarget::Tasks(names) => self.run_named(&names, &mut done).await?,
                BuildTarget::Func(f) => {
                    debug!("running anonymous task");
                    f().await?;
                }
            }
        }
        Ok(())
    }

    async fn run_named(&self, names: &[TaskName], done: &mut HashSet<TaskName>) -> Result<()> {
        // Resolve under the lock, run without it.
        let steps: Vec<(TaskName, TaskAction)> = {
            let tasks = self
                .inner
                .tasks
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let graph = TaskGraph::from_tasks(tasks.iter().map(|(n, t)| (n.as_str(), t.deps())));
            graph
                .plan(names)?
                .into_iter()
                .filter(|name| !done.contains(name))
                .filter_map(|name| {
                    let action = tasks.get(&name)?.action().clone();
                    Some((name, action))
                })
                .collect()
        };

        for (name, action) in steps {
            info!(task = %name, "starting task");
            let started = Instant::now();

            let outcome = match action {
                TaskAction::Command(cmd) => run_command(&name, &cmd).await,
                TaskAction::Func(f) => f().await.map_err(TaskwatchError::from),
                TaskAction::None => Ok(()),
            };

            if let Err(err) = outcome {
                warn!(task = %name, error = %err, "task failed");
                return Err(err);
            }

            info!(
                task = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "finished task"
            );
            done.insert(name);
        }
        Ok(())
    }
}

impl TaskHost for App {
    fn build(
        &self,
        targets: Vec<BuildTarget>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.run_build(targets))
    }
}
