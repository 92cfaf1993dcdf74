// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Layering and resolving watcher options (`options`).
//! - Compiling file / directory / glob patterns (`patterns`).
//! - Wiring up a cross-platform filesystem watcher (`notify`) and turning its
//!   raw events into [`WatchEvent`]s delivered to listeners (`watcher`).
//!
//! It does **not** know about tasks or builds; the `plugin` module attaches
//! that behaviour through listeners.

pub mod events;
pub mod options;
pub mod path_utils;
pub mod patterns;
pub mod scan;
pub mod watcher;

pub use events::{WatchEvent, WatchEventKind};
pub use options::{WatchOptions, WatcherSettings, KNOWN_OPTION_KEYS};
pub use patterns::{PatternEntry, WatchPlan};
pub use watcher::{create_watcher, create_watcher_with_fs, FsWatcher};
