use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared, atomically replaceable reference to an immutable value.
///
/// Readers hold the lock only long enough to clone the inner `Arc`, then
/// work on their private copy. Writers build the next value elsewhere and
/// swap it in; nothing is ever mutated in place.
pub struct Snapshot<T> {
    inner: Arc<RwLock<Arc<T>>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Snapshot<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    pub async fn current(&self) -> Arc<T> {
        Arc::clone(&*self.inner.read().await)
    }

    pub async fn replace(&self, next: T) {
        let next = Arc::new(next);
        *self.inner.write().await = next;
    }
}
