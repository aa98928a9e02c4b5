use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::{catalog::Generation, error::Result};

/// Holds the single globally visible generation.
///
/// Readers clone the `Arc` under a read lock that is held only for the
/// clone, then work on their snapshot without any lock. Publishing swaps the
/// pointer under the write lock, so a reader sees the old generation or the
/// new one in full, never a mix. Superseded generations are freed when their
/// last snapshot is dropped.
#[derive(Debug)]
pub struct GenerationStore {
    current: RwLock<Arc<Generation>>,
    next_epoch: AtomicU64,
    rebuild_lock: Mutex<()>,
}

impl Default for GenerationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationStore {
    /// Starts with an empty generation at epoch 0.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Generation::empty())),
            next_epoch: AtomicU64::new(1),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// A consistent snapshot of the current generation.
    pub fn snapshot(&self) -> Arc<Generation> {
        Arc::clone(&self.current.read())
    }

    /// Publish a fully built generation, assigning it the next epoch.
    /// Returns the published snapshot.
    pub fn publish(&self, generation: Generation) -> Arc<Generation> {
        let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst);
        let published = Arc::new(generation.with_epoch(epoch));
        *self.current.write() = Arc::clone(&published);
        published
    }

    /// Replace the current generation with `f(current)` without changing the
    /// epoch.
    ///
    /// `f` runs on a snapshot with no lock held. The result is swapped in only
    /// if the snapshot is still current; otherwise `f` runs again on the
    /// newer generation, so concurrent updates and publishes are never lost.
    pub fn update<F>(&self, f: F) -> Result<Arc<Generation>>
    where
        F: Fn(&Generation) -> Result<Generation>,
    {
        loop {
            let base = self.snapshot();
            let next = Arc::new(f(&base)?);

            let mut guard = self.current.write();
            if Arc::ptr_eq(&*guard, &base) {
                *guard = Arc::clone(&next);
                return Ok(next);
            }
            drop(guard);
            tracing::debug!("generation changed during update, retrying");
        }
    }

    /// Serializes rebuilds so generations are published in the order their
    /// scans started.
    pub fn lock_rebuild(&self) -> MutexGuard<'_, ()> {
        self.rebuild_lock.lock()
    }
}
