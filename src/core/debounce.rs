//! Debounce scheduler
//!
//! Delays a callback until `delay` has passed without another trigger.
//! Every trigger supersedes the pending one; superseded work never runs.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

struct Pending {
    /// Bumped on every trigger and cancel; a timer only fires if its generation is current
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

fn lock_pending<'a>(pending: &'a Mutex<Pending>, name: &str) -> MutexGuard<'a, Pending> {
    match pending.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("[Debouncer:{}] Mutex poisoned, recovering...", name);
            poisoned.into_inner()
        }
    }
}

fn cancel_pending(pending: &Mutex<Pending>, name: &str) -> bool {
    let mut pending = lock_pending(pending, name);
    pending.generation = pending.generation.wrapping_add(1);
    match pending.handle.take() {
        Some(handle) => {
            handle.abort();
            log::debug!("[Debouncer:{}] Cancelled pending invocation", name);
            true
        }
        None => false,
    }
}

/// Time-delayed invocation with cancel-on-retrigger semantics.
///
/// Timers run on the Tokio runtime, so `trigger` must be called from within one.
pub struct Debouncer<A> {
    name: &'static str,
    delay: Duration,
    callback: Arc<dyn Fn(A) + Send + Sync>,
    pending: Arc<Mutex<Pending>>,
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new<F>(name: &'static str, delay: Duration, callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            name,
            delay,
            callback: Arc::new(callback),
            pending: Arc::new(Mutex::new(Pending {
                generation: 0,
                handle: None,
            })),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `callback(args)` after `delay`, replacing any pending invocation
    pub fn trigger(&self, args: A) {
        let mut pending = lock_pending(&self.pending, self.name);
        pending.generation = pending.generation.wrapping_add(1);
        let generation = pending.generation;

        if let Some(previous) = pending.handle.take() {
            previous.abort();
        }

        let callback = Arc::clone(&self.callback);
        let slot = Arc::clone(&self.pending);
        let delay = self.delay;
        let name = self.name;

        pending.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut pending = lock_pending(&slot, name);
                if pending.generation != generation {
                    return;
                }
                pending.handle = None;
            }
            callback(args);
        }));
    }

    /// Cancel the pending invocation. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        cancel_pending(&self.pending, self.name)
    }

    pub fn is_pending(&self) -> bool {
        lock_pending(&self.pending, self.name).handle.is_some()
    }

    /// Handle that cancels this debouncer's pending invocation from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            name: self.name,
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        cancel_pending(&self.pending, self.name);
    }
}

#[derive(Clone)]
pub struct CancelHandle {
    name: &'static str,
    pending: Arc<Mutex<Pending>>,
}

impl CancelHandle {
    pub fn cancel(&self) -> bool {
        cancel_pending(&self.pending, self.name)
    }
}
