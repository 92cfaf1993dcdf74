// src/watch/scan.rs

//! Initial scan: the entries that already exist when a watcher starts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::watch::events::{WatchEvent, WatchEventKind};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchPlan;

/// Walk every watched root and report the matching entries as `add` /
/// `add_dir` events. Unreadable directories are skipped with a warning.
///
/// Symlinked directories are descended only with `follow_symlinks`; a
/// directory reached again through a link is read once.
pub fn initial_scan(plan: &WatchPlan, fs: &dyn FileSystem) -> Vec<WatchEvent> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut events = Vec::new();

    for entry in plan.entries() {
        if !fs.is_dir(entry.root()) {
            debug!(root = ?entry.root(), "watch root is not a directory; nothing to scan");
            continue;
        }

        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut stack = vec![entry.root().to_path_buf()];
        while let Some(dir) = stack.pop() {
            let real = fs.canonicalize(&dir).unwrap_or_else(|_| dir.clone());
            if !visited.insert(real) {
                debug!(dir = ?dir, "directory already scanned through another path");
                continue;
            }

            let children = match fs.read_dir(&dir) {
                Ok(children) => children,
                Err(err) => {
                    warn!(dir = ?dir, error = %err, "initial scan could not read directory");
                    continue;
                }
            };

            for path in children {
                let is_dir = fs.is_dir(&path) && (plan.follow_symlinks() || !fs.is_symlink(&path));

                if is_dir && entry.is_recursive() && should_descend(plan, entry.root(), &path) {
                    stack.push(path.clone());
                }

                if !entry.matches(&path, plan.depth()) || plan.is_ignored(&path) {
                    continue;
                }
                if !seen.insert(path.clone()) {
                    continue;
                }

                let kind = if is_dir {
                    WatchEventKind::AddDir
                } else {
                    WatchEventKind::Add
                };
                events.push(WatchEvent::new(kind, plan.display_path(&path)));
            }
        }
    }

    events
}

fn should_descend(plan: &WatchPlan, root: &Path, dir: &Path) -> bool {
    if plan.is_ignored(dir) {
        return false;
    }
    match (plan.depth(), relative_str(root, dir)) {
        (Some(max), Some(rel)) => rel.matches('/').count() < max,
        _ => true,
    }
}
