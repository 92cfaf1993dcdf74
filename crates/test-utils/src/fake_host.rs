use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use taskwatch::errors::{Result, TaskwatchError};
use taskwatch::host::TaskHost;
use taskwatch::types::BuildTarget;

/// A fake build host that:
/// - records the targets of every build call,
/// - optionally sleeps to simulate a long build,
/// - optionally fails every build,
/// - tracks how many builds overlapped.
pub struct FakeHost {
    delay: Duration,
    fail: AtomicBool,
    calls: Mutex<Vec<Vec<String>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    finished: watch::Sender<usize>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        let (finished, _) = watch::channel(0);
        Self {
            delay,
            fail: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            finished,
        }
    }

    /// Make every following build fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Targets of each build call, in call order. Named targets are listed
    /// by name, task lists joined with `+`, closures as `<fn>`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn finished_count(&self) -> usize {
        *self.finished.borrow()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` builds have completed.
    pub async fn wait_for_finished(&self, n: usize) {
        let mut rx = self.finished.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(targets: &[BuildTarget]) -> Vec<String> {
    targets
        .iter()
        .map(|t| match t {
            BuildTarget::Task(name) => name.clone(),
            BuildTarget::Tasks(names) => names.join("+"),
            BuildTarget::Func(_) => "<fn>".to_string(),
        })
        .collect()
}

impl TaskHost for FakeHost {
    fn build(
        &self,
        targets: Vec<BuildTarget>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(describe(&targets));

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.finished.send_modify(|count| *count += 1);

            if self.fail.load(Ordering::SeqCst) {
                return Err(TaskwatchError::TaskFailed {
                    task: "fake".to_string(),
                    code: 1,
                });
            }
            Ok(())
        })
    }
}
