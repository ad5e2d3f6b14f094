//! Copy-on-write snapshot cell.
//!
//! Readers load the current value without blocking. Writers compute a
//! replacement from the value they read and publish it with compare-and-swap,
//! retrying from the latest value if another writer won first. A reader never
//! observes a partially applied update.

use arc_swap::ArcSwap;
use std::sync::Arc;

pub struct AtomicSnapshot<T> {
    current: ArcSwap<T>,
}

impl<T> AtomicSnapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(value),
        }
    }

    /// Returns the current snapshot.
    pub fn load(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Replaces the value with `new` only if it is still `expected`.
    pub fn compare_and_swap(&self, expected: &Arc<T>, new: Arc<T>) -> bool {
        let previous = self.current.compare_and_swap(expected, new);
        Arc::ptr_eq(&*previous, expected)
    }

    /// Applies `update` until the result is published without a conflicting
    /// write in between. An error from `update` aborts without publishing.
    ///
    /// `update` may run more than once.
    pub fn update<E>(&self, mut update: impl FnMut(&T) -> Result<T, E>) -> Result<Arc<T>, E> {
        loop {
            let current = self.load();
            let next = Arc::new(update(&current)?);
            if self.compare_and_swap(&current, Arc::clone(&next)) {
                return Ok(next);
            }
        }
    }

    /// Infallible form of [`update`](Self::update).
    pub fn modify(&self, mut modify: impl FnMut(&T) -> T) -> Arc<T> {
        loop {
            let current = self.load();
            let next = Arc::new(modify(&current));
            if self.compare_and_swap(&current, Arc::clone(&next)) {
                return next;
            }
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for AtomicSnapshot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AtomicSnapshot").field(&self.load()).finish()
    }
}
