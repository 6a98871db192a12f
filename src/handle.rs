use parking_lot::{Mutex, MutexGuard};
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Identifies the pool that allocated an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolId(u64);

impl PoolId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        PoolId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Instance<T> {
    pool: PoolId,
    index: usize,
    payload: Mutex<T>,
}

/// A reference to one pooled instance.
///
/// Handles are compared and hashed by identity, so two clones of the same
/// handle are equal while two instances with equal payloads are not. Cloning
/// a handle does not check anything out; the pool tracks checkout per
/// instance, not per clone.
pub struct Handle<T> {
    inner: Arc<Instance<T>>,
}

impl<T> Handle<T> {
    pub(crate) fn new(pool: PoolId, index: usize, payload: T) -> Self {
        Handle {
            inner: Arc::new(Instance {
                pool,
                index,
                payload: Mutex::new(payload),
            }),
        }
    }

    /// Locks the payload for access.
    ///
    /// The pool does not wait on payload locks: releasing the handle while
    /// the guard is alive fails with [`crate::ReleaseError::PayloadLocked`].
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.payload.lock()
    }

    /// Attempts to lock the payload without blocking.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.payload.try_lock()
    }

    /// The pool that allocated this instance.
    pub fn pool_id(&self) -> PoolId {
        self.inner.pool
    }

    /// Position of this instance in its pool's allocation order.
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Returns true if both handles refer to the same instance.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for Handle<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Handle::ptr_eq(self, other)
    }
}
impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("pool", &self.inner.pool)
            .field("index", &self.inner.index)
            .finish_non_exhaustive()
    }
}
