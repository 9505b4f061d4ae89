//! Cancellable deferred tasks on a virtual clock.
//!
//! Nothing here sleeps. The owner reports the current time to [`Scheduler::pop_due`]
//! and runs whatever comes back, which keeps every delay of the scan loop
//! observable and cancellable from tests.

use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle {
    due: Duration,
    seq: u64,
}

impl TaskHandle {
    pub fn due(&self) -> Duration {
        self.due
    }
}

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<TaskHandle, T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Scheduler {
            now: Duration::ZERO,
            next_seq: 0,
            queue: BTreeMap::new(),
        }
    }

    /// Time of the last dispatched task.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: T) -> TaskHandle {
        let handle = TaskHandle {
            due: self.now + delay,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.queue.insert(handle, task);
        handle
    }

    /// Returns `true` if the task was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.queue.remove(&handle).is_some()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.queue.contains_key(&handle)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|h| h.due)
    }

    /// Removes the earliest task due at or before `now`.
    /// Tasks with the same due time come out in scheduling order.
    pub fn pop_due(&mut self, now: Duration) -> Option<T> {
        let Some(&handle) = self.queue.keys().next() else {
            self.now = self.now.max(now);
            return None;
        };
        if handle.due > now {
            self.now = self.now.max(now);
            return None;
        }
        self.now = self.now.max(handle.due);
        self.queue.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
