use std::sync::Arc;

use parking_lot::Mutex;

use crate::store::{StoreSnapshot, TaskStore};

/// Cloneable handle for embedding the store behind more than one thread.
///
/// A single lock covers both lists, so a delete or restore is never observed
/// half-way between them.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<TaskStore>>,
}

impl SharedStore {
    pub fn new(store: TaskStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Runs `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut TaskStore) -> R) -> R {
        let mut store = self.inner.lock();
        f(&mut store)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.lock().snapshot()
    }
}
