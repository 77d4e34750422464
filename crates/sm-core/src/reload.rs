//! Publish-and-swap slot for built matchers
//!
//! Built automata and trees are immutable, so a reload builds a fresh one
//! and swaps it in. Readers holding the previous `Arc` finish against the
//! old version.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

/// Shared slot holding the current version of a value.
pub struct Published<T> {
    current: RwLock<Arc<T>>,
    generation: AtomicU64,
}

impl<T> Published<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current version.
    pub fn load(&self) -> Arc<T> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the current version and return the previous one.
    pub fn publish(&self, value: T) -> Arc<T> {
        let next = Arc::new(value);
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, next)
        };
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("published generation {generation}");
        previous
    }

    /// Number of successful `publish` calls.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
