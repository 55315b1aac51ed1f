use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counters for a service queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of tasks whose handler returned `Ok`.
    pub tasks_handled: usize,
    /// Number of tasks whose handler failed or panicked.
    pub tasks_failed: usize,
    /// Number of tasks dropped by a discarding stop.
    pub tasks_discarded: usize,
    /// Number of flush markers answered.
    pub flushes: usize,
}

/// Live counters shared between a queue handle and its worker.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    handled: AtomicUsize,
    failed: AtomicUsize,
    discarded: AtomicUsize,
    flushes: AtomicUsize,
    busy: AtomicBool,
}

impl Counters {
    pub(crate) fn handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn flushed(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            tasks_handled: self.handled.load(Ordering::Relaxed),
            tasks_failed: self.failed.load(Ordering::Relaxed),
            tasks_discarded: self.discarded.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}
