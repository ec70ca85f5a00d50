use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Registry of per-consumer operation counters. Used to detect when the pipeline has gone idle.
#[derive(Default)]
pub struct OpCounter {
    counters: Mutex<Vec<(&'static str, Arc<AtomicU64>)>>,
}

impl OpCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn total_op_count(&self) -> u64 {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, c)| c.load(Ordering::Relaxed))
            .sum()
    }

    pub fn counts(&self) -> Vec<(&'static str, u64)> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, c)| (*name, c.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn new_counter(&self, name: &'static str) -> Arc<AtomicU64> {
        let counter = Arc::new(AtomicU64::new(0));
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name, counter.clone()));
        counter
    }
}
