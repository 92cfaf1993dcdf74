// src/watch/events.rs

//! Change events reported by [`FsWatcher`](super::FsWatcher).

use std::fmt;
use std::path::{Path, PathBuf};

use notify::event::{CreateKind, MetadataKind, ModifyKind, RemoveKind};
use notify::EventKind;

use crate::fs::FileSystem;

/// Kind of a reported change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Add,
    AddDir,
    Change,
    Unlink,
    UnlinkDir,
}

impl WatchEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchEventKind::Add => "add",
            WatchEventKind::AddDir => "add_dir",
            WatchEventKind::Change => "change",
            WatchEventKind::Unlink => "unlink",
            WatchEventKind::UnlinkDir => "unlink_dir",
        }
    }

    /// Map a raw `notify` event kind for `path` onto a reported kind.
    ///
    /// Returns `None` for events that are not content changes (access,
    /// metadata-only updates, modifications of directories).
    pub fn from_notify(kind: &EventKind, path: &Path, fs: &dyn FileSystem) -> Option<Self> {
        match kind {
            EventKind::Create(CreateKind::Folder) => Some(WatchEventKind::AddDir),
            EventKind::Create(CreateKind::File) => Some(WatchEventKind::Add),
            EventKind::Create(_) => Some(added(path, fs)),
            EventKind::Modify(ModifyKind::Name(_)) => {
                if fs.exists(path) {
                    Some(added(path, fs))
                } else {
                    Some(WatchEventKind::Unlink)
                }
            }
            // The polling backend reports content writes as mtime changes.
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) if fs.is_file(path) => {
                Some(WatchEventKind::Change)
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) | EventKind::Any | EventKind::Other => {
                if fs.is_file(path) {
                    Some(WatchEventKind::Change)
                } else {
                    None
                }
            }
            EventKind::Remove(RemoveKind::Folder) => Some(WatchEventKind::UnlinkDir),
            EventKind::Remove(_) => Some(WatchEventKind::Unlink),
            EventKind::Access(_) => None,
        }
    }
}

fn added(path: &Path, fs: &dyn FileSystem) -> WatchEventKind {
    if fs.is_dir(path) {
        WatchEventKind::AddDir
    } else {
        WatchEventKind::Add
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change to a watched path.
///
/// `path` is relative to the watcher's `cwd` option when one is set, and
/// absolute otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}
