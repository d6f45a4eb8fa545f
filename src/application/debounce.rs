//! Trailing-edge debounce over an injected [`Scheduler`].

use std::sync::Arc;
use std::time::Duration;

use super::scheduler::{Scheduler, TimerHandle};

/// Debounce window used by the preview session.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// One deferred invocation, tagged with the window that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debounced<A> {
    pub generation: u64,
    pub value: A,
}

/// Collapses a burst of calls into one deferred invocation of `callback`
/// carrying the arguments of the last call.
///
/// Every [`Debouncer::call`] cancels the pending invocation and restarts the
/// window, so at most one timer is pending per instance. There is no leading
/// edge: the first call of a burst waits like every other.
///
/// A timer may already have fired when it is cancelled, with its invocation
/// still queued somewhere downstream. Each invocation therefore carries the
/// generation of its window; consumers check it with
/// [`Debouncer::is_current`] and drop anything older.
pub struct Debouncer<A> {
    scheduler: Arc<dyn Scheduler>,
    delay: Duration,
    callback: Arc<dyn Fn(Debounced<A>) + Send + Sync>,
    pending: Option<TimerHandle>,
    generation: u64,
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        delay: Duration,
        callback: impl Fn(Debounced<A>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            scheduler,
            delay,
            callback: Arc::new(callback),
            pending: None,
            generation: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether `generation` belongs to the latest window that was neither
    /// restarted nor cancelled.
    pub fn is_current(&self, generation: u64) -> bool {
        self.pending.is_some() && generation == self.generation
    }

    /// Schedule `callback(args)` after the window, replacing any pending call.
    pub fn call(&mut self, args: A) {
        self.cancel();
        let callback = Arc::clone(&self.callback);
        let generation = self.generation;
        let timer = self.scheduler.after(
            self.delay,
            Box::new(move || {
                callback(Debounced {
                    generation,
                    value: args,
                })
            }),
        );
        self.pending = Some(timer);
    }

    /// Accept the invocation of `generation` if it is current, closing its
    /// window. Returns `false` for superseded invocations.
    pub fn settle(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.pending = None;
        self.generation += 1;
        true
    }

    /// Drop the pending call, if any.
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(timer) = self.pending.take() {
            timer.cancel();
        }
    }
}
