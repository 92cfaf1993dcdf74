// src/watch/watcher.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::anyhow;
use notify::{Config, Event, PollWatcher, RecommendedWatcher, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskwatchError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::Pattern;
use crate::watch::events::{WatchEvent, WatchEventKind};
use crate::watch::options::WatcherSettings;
use crate::watch::patterns::WatchPlan;
use crate::watch::scan::initial_scan;

type EventListener = Box<dyn FnMut(&WatchEvent) + Send>;
type ReadyListener = Box<dyn FnMut() + Send>;
type ErrorListener = Box<dyn FnMut(&notify::Error) + Send>;

/// Input of the dispatch loop.
enum Signal {
    Raw(notify::Result<Event>),
    Synthetic(WatchEvent),
}

#[derive(Default)]
struct Listeners {
    ready_fired: bool,
    ready: Vec<ReadyListener>,
    all: Vec<EventListener>,
    by_kind: Vec<(WatchEventKind, EventListener)>,
    error: Vec<ErrorListener>,
}

impl Listeners {
    fn count(&self) -> usize {
        self.ready.len() + self.all.len() + self.by_kind.len() + self.error.len()
    }

    fn fire_ready(&mut self) {
        self.ready_fired = true;
        for listener in self.ready.iter_mut() {
            listener();
        }
    }

    fn fire_event(&mut self, event: &WatchEvent) {
        for (kind, listener) in self.by_kind.iter_mut() {
            if *kind == event.kind {
                listener(event);
            }
        }
        for listener in self.all.iter_mut() {
            listener(event);
        }
    }

    fn fire_error(&mut self, err: &notify::Error) {
        for listener in self.error.iter_mut() {
            listener(err);
        }
    }
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for a running file watcher.
///
/// Listeners run one at a time on the watcher's dispatch task, in the order
/// events arrive. A listener must not register further listeners on the same
/// watcher from inside its body.
///
/// The caller owns the handle: call [`close`](Self::close) (or drop it) to
/// stop watching and release OS resources.
pub struct FsWatcher {
    os: Option<Box<dyn Watcher + Send>>,
    signals: mpsc::UnboundedSender<Signal>,
    listeners: Arc<Mutex<Listeners>>,
    ready_rx: watch::Receiver<bool>,
    dispatch: JoinHandle<()>,
    pattern: Pattern,
    settings: WatcherSettings,
    roots: Vec<PathBuf>,
}

impl fmt::Debug for FsWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsWatcher")
            .field("pattern", &self.pattern)
            .field("roots", &self.roots)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Create and start a watcher for `pattern` on the real filesystem.
///
/// Must be called from within a Tokio runtime.
pub fn create_watcher(pattern: &Pattern, settings: &WatcherSettings) -> Result<FsWatcher> {
    create_watcher_with_fs(pattern, settings, Arc::new(RealFileSystem))
}

/// Like [`create_watcher`], with the filesystem used for the initial scan and
/// event classification supplied by the caller.
pub fn create_watcher_with_fs(
    pattern: &Pattern,
    settings: &WatcherSettings,
    fs: Arc<dyn FileSystem>,
) -> Result<FsWatcher> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
        TaskwatchError::Other(anyhow!("file watchers need a Tokio runtime: {e}"))
    })?;

    let plan = Arc::new(WatchPlan::compile(pattern, settings, fs.as_ref())?);

    // Channel from the blocking notify callback into the async world.
    let (signal_tx, signal_rx) = mpsc::unbounded_channel::<Signal>();

    let mut os = new_os_watcher(settings, signal_tx.clone())?;
    let mut roots = Vec::new();
    for (root, mode) in plan.watch_roots(fs.as_ref()) {
        os.watch(&root, mode)?;
        roots.push(root);
    }

    info!(%pattern, ?roots, polling = settings.use_polling, "file watcher started");

    let listeners = Arc::new(Mutex::new(Listeners::default()));
    let (ready_tx, ready_rx) = watch::channel(false);

    let dispatch = runtime.spawn(dispatch_loop(
        plan,
        fs,
        settings.ignore_initial,
        signal_rx,
        Arc::clone(&listeners),
        ready_tx,
    ));

    Ok(FsWatcher {
        os: Some(os),
        signals: signal_tx,
        listeners,
        ready_rx,
        dispatch,
        pattern: pattern.clone(),
        settings: settings.clone(),
        roots,
    })
}

fn new_os_watcher(
    settings: &WatcherSettings,
    signal_tx: mpsc::UnboundedSender<Signal>,
) -> Result<Box<dyn Watcher + Send>> {
    // Closure called synchronously by notify whenever an event arrives. A
    // send failure means the dispatch loop is gone, i.e. the watcher closed.
    let handler = move |res: notify::Result<Event>| {
        let _ = signal_tx.send(Signal::Raw(res));
    };

    let config = Config::default().with_follow_symlinks(settings.follow_symlinks);
    if settings.use_polling {
        let config = config.with_poll_interval(Duration::from_millis(settings.interval));
        Ok(Box::new(PollWatcher::new(handler, config)?))
    } else {
        Ok(Box::new(RecommendedWatcher::new(handler, config)?))
    }
}

async fn dispatch_loop(
    plan: Arc<WatchPlan>,
    fs: Arc<dyn FileSystem>,
    ignore_initial: bool,
    mut signal_rx: mpsc::UnboundedReceiver<Signal>,
    listeners: Arc<Mutex<Listeners>>,
    ready_tx: watch::Sender<bool>,
) {
    let scan = {
        let plan = Arc::clone(&plan);
        let fs = Arc::clone(&fs);
        tokio::task::spawn_blocking(move || initial_scan(&plan, fs.as_ref())).await
    };

    match scan {
        Ok(found) => {
            debug!(found = found.len(), ignore_initial, "initial scan complete");
            if !ignore_initial {
                let mut guard = lock(&listeners);
                for event in &found {
                    guard.fire_event(event);
                }
            }
        }
        Err(err) => warn!(error = %err, "initial scan task failed"),
    }

    lock(&listeners).fire_ready();
    ready_tx.send_replace(true);
    debug!("watcher ready");

    while let Some(signal) = signal_rx.recv().await {
        match signal {
            Signal::Synthetic(event) => {
                debug!(kind = %event.kind, path = ?event.path, "synthetic event");
                lock(&listeners).fire_event(&event);
            }
            Signal::Raw(Ok(event)) => {
                for path in &event.paths {
                    if !plan.matches(path) {
                        continue;
                    }
                    let Some(kind) = WatchEventKind::from_notify(&event.kind, path, fs.as_ref())
                    else {
                        continue;
                    };
                    let change = WatchEvent::new(kind, plan.display_path(path));
                    debug!(kind = %change.kind, path = ?change.path, "change detected");
                    lock(&listeners).fire_event(&change);
                }
            }
            Signal::Raw(Err(err)) => {
                warn!(error = %err, "file watch error");
                lock(&listeners).fire_error(&err);
            }
        }
    }

    debug!("watcher event loop finished");
}

impl FsWatcher {
    /// Run `f` once the initial scan has completed. Runs immediately if the
    /// watcher is already ready.
    pub fn on_ready(&self, f: impl FnMut() + Send + 'static) -> &Self {
        let mut listener: ReadyListener = Box::new(f);
        let mut guard = lock(&self.listeners);
        if guard.ready_fired {
            listener();
        }
        guard.ready.push(listener);
        self
    }

    /// Run `f` for every reported event, whatever its kind.
    pub fn on_all(&self, f: impl FnMut(&WatchEvent) + Send + 'static) -> &Self {
        lock(&self.listeners).all.push(Box::new(f));
        self
    }

    /// Run `f` for events of one kind.
    pub fn on(&self, kind: WatchEventKind, f: impl FnMut(&WatchEvent) + Send + 'static) -> &Self {
        lock(&self.listeners).by_kind.push((kind, Box::new(f)));
        self
    }

    /// Run `f` for errors reported by the OS watcher backend.
    pub fn on_error(&self, f: impl FnMut(&notify::Error) + Send + 'static) -> &Self {
        lock(&self.listeners).error.push(Box::new(f));
        self
    }

    /// Number of listeners attached through the `on*` methods.
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).count()
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Wait until the initial scan has completed (or the watcher closed).
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_rx.clone();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Queue an event for delivery to listeners as if it came from the
    /// filesystem. Synthetic events skip pattern filtering.
    ///
    /// Returns false if the watcher is closed.
    pub fn emit(&self, event: WatchEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        self.signals.send(Signal::Synthetic(event)).is_ok()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The resolved settings this watcher was created with.
    pub fn settings(&self) -> &WatcherSettings {
        &self.settings
    }

    /// Paths registered with the OS watcher.
    pub fn watched_roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_closed(&self) -> bool {
        self.os.is_none()
    }

    /// Stop watching. Events not yet delivered are discarded.
    pub fn close(&mut self) {
        if let Some(os) = self.os.take() {
            drop(os);
            self.dispatch.abort();
            info!(pattern = %self.pattern, "file watcher closed");
        }
    }
}

impl Drop for FsWatcher {
    fn drop(&mut self) {
        self.dispatch.abort();
    }
}
