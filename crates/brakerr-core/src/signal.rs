//! Producer/consumer plumbing between the poller and the reconciliation loop.
//!
//! [`StateCell`] holds the latest [`AggregateState`] as one unit;
//! [`ChangeSignal`] is a single-slot wake-up. The consumer always re-reads
//! the cell after a wake, so bursts of changes collapse into one wake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::session::AggregateState;

/// Latest published aggregate state. Single writer (poller), single reader
/// (reconciliation loop); both flags are read and written together.
#[derive(Debug, Default)]
pub struct StateCell {
    state: RwLock<AggregateState>,
}

impl StateCell {
    pub fn new(initial: AggregateState) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }

    pub fn publish(&self, state: AggregateState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn snapshot(&self) -> AggregateState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Capacity-1 wake-up event. `set` never blocks and is idempotent while the
/// signal is pending; a successful wait clears it.
#[derive(Debug, Default)]
pub struct ChangeSignal {
    pending: AtomicBool,
    notify: Notify,
}

impl ChangeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    pub fn is_set(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Waits up to `timeout` for the signal. Returns true (and clears the
    /// signal) if it was set, false on timeout.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.pending.swap(false, Ordering::AcqRel) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.pending.swap(false, Ordering::AcqRel);
            }
        }
    }
}
