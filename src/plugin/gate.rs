// src/plugin/gate.rs

//! Per-registration re-entrancy gate.
//!
//! ```text
//! Initializing --ready--> Idle --change--> Building --build done--> Idle
//! ```
//!
//! Change events that arrive while `Initializing` or `Building` are dropped.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

/// State of one watch registration's build trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Waiting for the watcher's initial scan.
    Initializing,
    /// Ready to start a build.
    Idle,
    /// A build is in flight.
    Building,
}

/// The building flag, as a small state machine behind a mutex so the
/// check-then-set in [`try_begin`](Self::try_begin) is atomic.
#[derive(Debug)]
pub struct BuildGate {
    state: Mutex<GateState>,
}

impl Default for BuildGate {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Initializing),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> GateState {
        *self.lock()
    }

    pub fn is_building(&self) -> bool {
        self.state() != GateState::Idle
    }

    /// Leave `Initializing`. Later calls are no-ops.
    pub fn mark_ready(&self) {
        let mut state = self.lock();
        if *state == GateState::Initializing {
            *state = GateState::Idle;
            debug!("build gate ready");
        }
    }

    /// Move `Idle` to `Building`. Returns false, leaving the state alone, if
    /// the gate was not idle.
    pub fn try_begin(&self) -> bool {
        let mut state = self.lock();
        if *state == GateState::Idle {
            *state = GateState::Building;
            true
        } else {
            trace!(state = ?*state, "build gate closed");
            false
        }
    }

    /// Move `Building` back to `Idle`.
    pub fn finish(&self) {
        let mut state = self.lock();
        if *state == GateState::Building {
            *state = GateState::Idle;
        }
    }
}

/// Releases the gate when dropped, so a panicking build still reopens it.
pub(crate) struct Release<'a>(pub(crate) &'a BuildGate);

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}
