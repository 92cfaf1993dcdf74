// src/host/task.rs

//! Task definitions registered on an [`App`](super::App).

use std::fmt;
use std::future::Future;

use crate::types::{task_fn, TaskFn, TaskName};

/// What a task does when it runs.
#[derive(Clone)]
pub enum TaskAction {
    /// Shell command run through `sh -c` (`cmd /C` on Windows).
    Command(String),
    /// Async closure.
    Func(TaskFn),
    /// Nothing; the task only groups its dependencies.
    None,
}

impl fmt::Debug for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            TaskAction::Func(_) => f.write_str("Func(..)"),
            TaskAction::None => f.write_str("None"),
        }
    }
}

/// A named unit of work and the tasks that must run before it.
#[derive(Debug, Clone)]
pub struct Task {
    after: Vec<TaskName>,
    action: TaskAction,
}

impl Task {
    pub fn command(cmd: impl Into<String>) -> Self {
        Self {
            after: Vec::new(),
            action: TaskAction::Command(cmd.into()),
        }
    }

    pub fn func<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            after: Vec::new(),
            action: TaskAction::Func(task_fn(f)),
        }
    }

    /// A task with no body of its own.
    pub fn group<I, S>(deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            after: deps.into_iter().map(Into::into).collect(),
            action: TaskAction::None,
        }
    }

    /// Add a dependency.
    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.after.push(dep.into());
        self
    }

    pub fn deps(&self) -> &[TaskName] {
        &self.after
    }

    pub fn action(&self) -> &TaskAction {
        &self.action
    }
}
