//! Deferred execution behind an injectable clock.
//!
//! [`TokioScheduler`] runs tasks on the Tokio timer; [`ManualScheduler`] is a
//! simulated clock that only moves when told to, so debounce behaviour can be
//! tested without sleeping.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;

use super::lock::mutex_lock;

const SOURCE: &str = "application::scheduler";

/// Work to run once a delay has elapsed.
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Run `task` once `delay` has elapsed, unless the returned handle is
    /// cancelled first.
    fn after(&self, delay: Duration, task: ScheduledTask) -> TimerHandle;
}

/// Cancels a scheduled task. Dropping the handle leaves the task scheduled.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the task. A no-op when it already ran.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Wall-clock scheduler backed by `tokio::time::sleep`.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, task: ScheduledTask) -> TimerHandle {
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        TimerHandle::new(move || timer.abort())
    }
}

/// Simulated clock. Tasks fire only from [`ManualScheduler::advance`], in
/// deadline order, ties broken by scheduling order.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, u64), ScheduledTask>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the scheduler was created.
    pub fn now(&self) -> Duration {
        mutex_lock(&self.clock, SOURCE, "now").now
    }

    /// Number of tasks waiting for their deadline.
    pub fn pending(&self) -> usize {
        mutex_lock(&self.clock, SOURCE, "pending").pending.len()
    }

    /// Move the clock forward by `by`, running every task that falls due.
    /// Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;

        loop {
            let task = {
                let mut clock = mutex_lock(&self.clock, SOURCE, "advance");
                let due = clock
                    .pending
                    .keys()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= target);
                match due {
                    Some(key) => {
                        clock.now = key.0;
                        clock.pending.remove(&key)
                    }
                    None => {
                        clock.now = target;
                        None
                    }
                }
            };

            // Tasks run outside the lock; they may schedule further work.
            match task {
                Some(task) => {
                    task();
                    fired += 1;
                }
                None => return fired,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, task: ScheduledTask) -> TimerHandle {
        let key = {
            let mut clock = mutex_lock(&self.clock, SOURCE, "after");
            let key = (clock.now + delay, clock.next_id);
            clock.next_id += 1;
            clock.pending.insert(key, task);
            key
        };

        let clock = Arc::clone(&self.clock);
        TimerHandle::new(move || {
            mutex_lock(&clock, SOURCE, "cancel").pending.remove(&key);
        })
    }
}
