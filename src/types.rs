// src/types.rs

//! Small value types shared between the host app, the plugin and the config.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

/// Canonical task name type.
pub type TaskName = String;

/// Future returned by a closure task.
pub type TaskFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A task body supplied as a closure rather than a registered name.
pub type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Wrap an async closure as a [`TaskFn`].
pub fn task_fn<F, Fut>(f: F) -> TaskFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as TaskFuture)
}

/// One or more file, directory or glob patterns.
///
/// Deserializes from either a single string or an array of strings:
///
/// ```toml
/// pattern = "src/**/*.rs"
/// pattern = ["src/**/*.rs", "Cargo.toml"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "PatternRepr")]
pub struct Pattern(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternRepr {
    One(String),
    Many(Vec<String>),
}

impl From<PatternRepr> for Pattern {
    fn from(repr: PatternRepr) -> Self {
        match repr {
            PatternRepr::One(s) => Pattern(vec![s]),
            PatternRepr::Many(v) => Pattern(v),
        }
    }
}

impl Pattern {
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|p| p.trim().is_empty())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern(vec![s.to_string()])
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Pattern(vec![s])
    }
}

impl From<Vec<String>> for Pattern {
    fn from(v: Vec<String>) -> Self {
        Pattern(v)
    }
}

impl From<&[&str]> for Pattern {
    fn from(v: &[&str]) -> Self {
        Pattern(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Pattern {
    fn from(v: [&str; N]) -> Self {
        Pattern(v.iter().map(|s| s.to_string()).collect())
    }
}

/// A single argument forwarded to the host's build operation.
#[derive(Clone)]
pub enum BuildTarget {
    /// A single registered task name.
    Task(TaskName),
    /// An ordered list of registered task names.
    Tasks(Vec<TaskName>),
    /// An anonymous task body.
    Func(TaskFn),
}

impl fmt::Debug for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTarget::Task(name) => f.debug_tuple("Task").field(name).finish(),
            BuildTarget::Tasks(names) => f.debug_tuple("Tasks").field(names).finish(),
            BuildTarget::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&str> for BuildTarget {
    fn from(s: &str) -> Self {
        BuildTarget::Task(s.to_string())
    }
}

impl From<String> for BuildTarget {
    fn from(s: String) -> Self {
        BuildTarget::Task(s)
    }
}

impl From<Vec<String>> for BuildTarget {
    fn from(v: Vec<String>) -> Self {
        BuildTarget::Tasks(v)
    }
}

impl From<&[&str]> for BuildTarget {
    fn from(v: &[&str]) -> Self {
        BuildTarget::Tasks(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for BuildTarget {
    fn from(v: [&str; N]) -> Self {
        BuildTarget::Tasks(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<TaskFn> for BuildTarget {
    fn from(f: TaskFn) -> Self {
        BuildTarget::Func(f)
    }
}
