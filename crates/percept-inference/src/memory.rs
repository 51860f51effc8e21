//! Allocation tracking for tensor lifecycles.
//!
//! Every tensor created through a [`MemoryTracker`] holds a guard that
//! decrements the live count when dropped. A prediction call is leak-free
//! when the live count after the call equals the count before it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Snapshot of tensor allocation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Tensors currently alive.
    pub live_tensors: usize,
    /// Highest number of tensors alive at any point.
    pub peak_tensors: usize,
    /// Total tensors ever allocated.
    pub total_allocations: usize,
}

#[derive(Debug, Default)]
struct TrackerInner {
    live: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

/// Shared counter of live tensor allocations.
///
/// Cloning is cheap; clones share the same counters. One tracker is scoped
/// to one session and handed to every component that creates tensors.
#[derive(Debug, Clone, Default)]
pub struct MemoryTracker {
    inner: Arc<TrackerInner>,
}

impl MemoryTracker {
    /// Create a new tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new allocation and return its guard.
    pub(crate) fn register(&self) -> AllocGuard {
        let live = self.inner.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.total.fetch_add(1, Ordering::SeqCst);
        self.inner.peak.fetch_max(live, Ordering::SeqCst);
        AllocGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of tensors currently alive.
    pub fn live_tensors(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Snapshot all counters.
    pub fn snapshot(&self) -> MemoryInfo {
        MemoryInfo {
            live_tensors: self.inner.live.load(Ordering::SeqCst),
            peak_tensors: self.inner.peak.load(Ordering::SeqCst),
            total_allocations: self.inner.total.load(Ordering::SeqCst),
        }
    }
}

/// Guard tied to one tensor allocation.
#[derive(Debug)]
pub(crate) struct AllocGuard {
    inner: Arc<TrackerInner>,
}

impl Drop for AllocGuard {
    fn drop(&mut self) {
        self.inner.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_count_follows_guards() {
        let tracker = MemoryTracker::new();
        assert_eq!(tracker.live_tensors(), 0);

        let a = tracker.register();
        let b = tracker.register();
        assert_eq!(tracker.live_tensors(), 2);

        drop(a);
        assert_eq!(tracker.live_tensors(), 1);

        drop(b);
        assert_eq!(tracker.live_tensors(), 0);
    }

    #[test]
    fn test_peak_and_total_are_monotonic() {
        let tracker = MemoryTracker::new();

        {
            let _a = tracker.register();
            let _b = tracker.register();
        }
        let _c = tracker.register();

        let info = tracker.snapshot();
        assert_eq!(info.live_tensors, 1);
        assert_eq!(info.peak_tensors, 2);
        assert_eq!(info.total_allocations, 3);
    }

    #[test]
    fn test_clones_share_counters() {
        let tracker = MemoryTracker::new();
        let clone = tracker.clone();

        let _guard = tracker.register();
        assert_eq!(clone.live_tensors(), 1);
    }
}
