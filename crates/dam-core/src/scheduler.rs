//! Background task scheduling.
//!
//! The registry owns one [`Scheduler`] and hands it to each strategy at
//! construction. It is an explicit capability, not a process-wide facility:
//! shutting the registry down deterministically cancels every scheduled
//! tick, which keeps lifecycle testable.
//!
//! Tasks scheduled for different roots run as independent tokio tasks and
//! never serialize against each other.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

/// Owner of all periodic background tasks. Must be created and used inside
/// a tokio runtime.
#[derive(Debug, Default)]
pub struct Scheduler {
    handles: Mutex<Vec<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task invoking `tick` immediately and then once per `period`.
    ///
    /// Missed ticks are delayed, not bunched, so a slow tick never causes a
    /// burst of catch-up invocations. The returned [`AbortHandle`] lets the
    /// owning strategy cancel its own task independently of a full
    /// scheduler shutdown.
    pub fn schedule_repeating<F, Fut>(&self, period: Duration, mut tick: F) -> AbortHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        });
        let abort_handle = handle.abort_handle();

        let mut handles = self.handles.lock();
        if self.shut_down.load(Ordering::SeqCst) {
            // Scheduled after shutdown: cancel right away.
            handle.abort();
        } else {
            handles.push(handle);
        }
        abort_handle
    }

    /// Cancel all scheduled tasks. Idempotent. In-flight blocking work
    /// finishes on its worker thread; its result is discarded because the
    /// continuation after the await point never runs.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}
