//! Atomic run counters shared by the worker pool.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe per-category counters. Strictly monotonic within a run;
/// workers credit a batch only after its write committed.
#[derive(Debug, Default)]
pub struct SyncCounters {
    inserted: AtomicU64,
    updated: AtomicU64,
    ignored: AtomicU64,
}

impl SyncCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_inserted(&self, n: u64) {
        self.inserted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_updated(&self, n: u64) {
        self.updated.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_ignored(&self, n: u64) {
        self.ignored.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inserted(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    pub fn updated(&self) -> u64 {
        self.updated.load(Ordering::Relaxed)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counters = Arc::new(SyncCounters::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counters = Arc::clone(&counters);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    counters.add_inserted(1);
                    counters.add_ignored(2);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.inserted(), 8_000);
        assert_eq!(counters.ignored(), 16_000);
        assert_eq!(counters.updated(), 0);
    }
}
