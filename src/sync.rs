//! Monitor primitive for server readiness signalling.
//!
//! A [`Monitor`] pairs mutex-guarded state with a notification primitive,
//! so that the code mutating the state and the code waiting on it share one
//! synchronization context. The server runtime updates a
//! [`Readiness`] monitor from its lifecycle hooks; external code (typically
//! a test driver) waits on the same monitor before connecting, which removes
//! the race between "server task spawned" and "server socket bound".
//!
//! # Example
//!
//! ```ignore
//! let ready = server.readiness();
//! ready.wait_until(|r| r.listening.then_some(())).await;
//! // safe to connect now
//! ```

use std::sync::Mutex;

use tokio::sync::Notify;

/// Mutex-guarded state plus a condition-style notifier.
///
/// `update` notifies all waiters; `wait_until` registers for notification
/// *before* re-checking its predicate and loops, so a wake between the check
/// and the await is never lost and spurious wakes are harmless.
pub struct Monitor<T> {
    state: Mutex<T>,
    notify: Notify,
}

impl<T> Monitor<T> {
    /// Create a monitor around an initial state.
    pub fn new(state: T) -> Self {
        Self {
            state: Mutex::new(state),
            notify: Notify::new(),
        }
    }

    /// Inspect the state under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Mutate the state under the lock, then wake every waiter.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut guard)
        };
        self.notify.notify_waiters();
        result
    }

    /// Suspend until `pred` returns `Some`, re-checking on every wake.
    ///
    /// The predicate is evaluated once before suspending, so a condition
    /// that already holds returns without waiting.
    pub async fn wait_until<R>(&self, mut pred: impl FnMut(&T) -> Option<R>) -> R {
        loop {
            let notified = self.notify.notified();
            if let Some(result) = self.read(&mut pred) {
                return result;
            }
            notified.await;
        }
    }
}

/// Server readiness state, mutated only through its [`Monitor`].
///
/// Both fields are monotonic: `listening` flips false to true exactly once
/// per server lifecycle, `accepted` only increases.
#[derive(Debug, Default, Clone, Copy)]
pub struct Readiness {
    /// Listener is bound and the accept loop is about to run.
    pub listening: bool,
    /// Number of connections accepted so far.
    pub accepted: u64,
}
