// src/plugin/args.rs

//! Argument shapes accepted by `watch`.
//!
//! `watch(pattern, args)` takes positional arguments: an optional leading
//! options table followed by build targets. [`WatchRequest::from_args`] turns
//! that list into the typed form.

use std::fmt;

use tracing::warn;

use crate::types::{BuildTarget, Pattern, TaskFn, TaskName};
use crate::watch::WatchOptions;

/// One positional argument after the pattern.
#[derive(Clone)]
pub enum WatchArg {
    /// An options table. Only meaningful in first position.
    Options(WatchOptions),
    /// Something forwarded to the host's build operation.
    Target(BuildTarget),
}

impl fmt::Debug for WatchArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchArg::Options(opts) => f.debug_tuple("Options").field(opts).finish(),
            WatchArg::Target(target) => f.debug_tuple("Target").field(target).finish(),
        }
    }
}

impl From<WatchOptions> for WatchArg {
    fn from(opts: WatchOptions) -> Self {
        WatchArg::Options(opts)
    }
}

impl From<toml::Table> for WatchArg {
    fn from(table: toml::Table) -> Self {
        WatchArg::Options(table.into())
    }
}

impl From<BuildTarget> for WatchArg {
    fn from(target: BuildTarget) -> Self {
        WatchArg::Target(target)
    }
}

impl From<&str> for WatchArg {
    fn from(s: &str) -> Self {
        WatchArg::Target(s.into())
    }
}

impl From<String> for WatchArg {
    fn from(s: String) -> Self {
        WatchArg::Target(s.into())
    }
}

impl From<Vec<String>> for WatchArg {
    fn from(v: Vec<String>) -> Self {
        WatchArg::Target(v.into())
    }
}

impl From<&[&str]> for WatchArg {
    fn from(v: &[&str]) -> Self {
        WatchArg::Target(v.into())
    }
}

impl<const N: usize> From<[&str; N]> for WatchArg {
    fn from(v: [&str; N]) -> Self {
        WatchArg::Target(v.into())
    }
}

impl From<TaskFn> for WatchArg {
    fn from(f: TaskFn) -> Self {
        WatchArg::Target(f.into())
    }
}

/// Typed form of a `watch` call.
#[derive(Debug, Clone)]
pub struct WatchRequest {
    pub pattern: Pattern,
    pub options: Option<WatchOptions>,
    pub targets: Vec<BuildTarget>,
}

impl WatchRequest {
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        Self {
            pattern: pattern.into(),
            options: None,
            targets: Vec::new(),
        }
    }

    pub fn options(mut self, options: WatchOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn target(mut self, target: impl Into<BuildTarget>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Shorthand for a single target listing `tasks`.
    pub fn tasks<I, S>(self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let names: Vec<TaskName> = tasks.into_iter().map(Into::into).collect();
        self.target(names)
    }

    /// Split positional arguments: a leading options table is taken as the
    /// options, everything else is a build target.
    pub fn from_args(pattern: impl Into<Pattern>, args: Vec<WatchArg>) -> Self {
        let mut args = args.into_iter().peekable();

        let options = match args.next_if(|a| matches!(a, WatchArg::Options(_))) {
            Some(WatchArg::Options(opts)) => Some(opts),
            _ => None,
        };

        let mut targets = Vec::new();
        for (index, arg) in args.enumerate() {
            match arg {
                WatchArg::Target(target) => targets.push(target),
                WatchArg::Options(opts) => {
                    let keys: Vec<&str> = opts.keys().collect();
                    warn!(?keys, index, "options table after a build target is ignored");
                }
            }
        }

        Self {
            pattern: pattern.into(),
            options,
            targets,
        }
    }

    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }
}
