#![allow(dead_code)]

pub use taskwatch_test_utils::builders;
pub use taskwatch_test_utils::fake_host::FakeHost;
pub use taskwatch_test_utils::{init_tracing, with_timeout};

use std::fs;
use std::path::Path;
use std::time::Duration;

use taskwatch::plugin::{BuildGate, GateState};
use taskwatch::watch::{WatchEvent, WatchEventKind, WatchOptions};
use tempfile::TempDir;

/// A temporary project containing `a.txt`.
pub fn project() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("a.txt"), "one").expect("write a.txt");
    dir
}

pub fn cwd_options(dir: &Path) -> WatchOptions {
    WatchOptions::new().with("cwd", dir.to_string_lossy().into_owned())
}

pub fn change(path: &str) -> WatchEvent {
    WatchEvent::new(WatchEventKind::Change, path)
}

/// Poll `cond` every 10ms until it holds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    while !cond() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_idle(gate: &BuildGate) {
    wait_until(|| gate.state() == GateState::Idle).await;
}
