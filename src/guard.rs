use crate::{Handle, ObjectPool, PoolAllocator, ReleaseError};
use std::{
    borrow::Borrow,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::Arc,
};

/// A guard over an acquired instance that borrows its pool.
///
/// The instance is released back to the pool when the guard is dropped.
pub struct RefGuard<'a, A: PoolAllocator<T>, T> {
    handle: Handle<T>,
    pool: &'a ObjectPool<A, T>,
    armed: bool,
}

impl<'a, A: PoolAllocator<T>, T> RefGuard<'a, A, T> {
    pub(crate) fn new(handle: Handle<T>, pool: &'a ObjectPool<A, T>) -> Self {
        RefGuard {
            handle,
            pool,
            armed: true,
        }
    }

    /// Consumes the guard and returns the handle, without releasing it.
    ///
    /// The instance stays checked out until [`ObjectPool::release`] is
    /// called with the handle.
    pub fn into_inner(mut self) -> Handle<T> {
        self.armed = false;
        self.handle.clone()
    }

    /// Releases the instance now, reporting protocol violations instead of
    /// logging them.
    pub fn release(mut self) -> Result<(), ReleaseError> {
        self.armed = false;
        self.pool.release(&self.handle)
    }
}

impl<'a, A: PoolAllocator<T>, T> Deref for RefGuard<'a, A, T> {
    type Target = Handle<T>;
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<'a, A: PoolAllocator<T>, T> Drop for RefGuard<'a, A, T> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.pool.release(&self.handle) {
                log::error!("guard failed to release instance: {err}");
            }
        }
    }
}

impl<'a, A: PoolAllocator<T>, T> fmt::Debug for RefGuard<'a, A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefGuard").field(&self.handle).finish()
    }
}
impl<'a, A: PoolAllocator<T>, T> PartialEq for RefGuard<'a, A, T> {
    #[inline]
    fn eq(&self, other: &RefGuard<'a, A, T>) -> bool {
        self.handle == other.handle
    }
}
impl<'a, A: PoolAllocator<T>, T> Eq for RefGuard<'a, A, T> {}
impl<'a, A: PoolAllocator<T>, T> Hash for RefGuard<'a, A, T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}
impl<'a, A: PoolAllocator<T>, T> Borrow<Handle<T>> for RefGuard<'a, A, T> {
    #[inline(always)]
    fn borrow(&self) -> &Handle<T> {
        &self.handle
    }
}
impl<'a, A: PoolAllocator<T>, T> AsRef<Handle<T>> for RefGuard<'a, A, T> {
    #[inline(always)]
    fn as_ref(&self) -> &Handle<T> {
        &self.handle
    }
}

/// A guard over an acquired instance that holds an arc reference to its
/// pool.
///
/// The instance is released back to the pool when the guard is dropped.
pub struct RcGuard<A: PoolAllocator<T>, T> {
    handle: Handle<T>,
    pool: Arc<ObjectPool<A, T>>,
    armed: bool,
}

impl<A: PoolAllocator<T>, T> RcGuard<A, T> {
    pub(crate) fn new(handle: Handle<T>, pool: &Arc<ObjectPool<A, T>>) -> Self {
        RcGuard {
            handle,
            pool: pool.clone(),
            armed: true,
        }
    }

    /// Consumes the guard and returns the handle, without releasing it.
    ///
    /// The arc reference to the pool is dropped with the guard.
    pub fn into_inner(mut self) -> Handle<T> {
        self.armed = false;
        self.handle.clone()
    }

    /// Releases the instance now, reporting protocol violations instead of
    /// logging them.
    pub fn release(mut self) -> Result<(), ReleaseError> {
        self.armed = false;
        self.pool.release(&self.handle)
    }

    /// The pool this guard will release to.
    pub fn pool(&self) -> &Arc<ObjectPool<A, T>> {
        &self.pool
    }
}

impl<A: PoolAllocator<T>, T> Deref for RcGuard<A, T> {
    type Target = Handle<T>;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<A: PoolAllocator<T>, T> Drop for RcGuard<A, T> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.pool.release(&self.handle) {
                log::error!("guard failed to release instance: {err}");
            }
        }
    }
}

impl<A: PoolAllocator<T>, T> fmt::Debug for RcGuard<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RcGuard").field(&self.handle).finish()
    }
}
impl<A: PoolAllocator<T>, T> PartialEq for RcGuard<A, T> {
    #[inline]
    fn eq(&self, other: &RcGuard<A, T>) -> bool {
        self.handle == other.handle
    }
}
impl<A: PoolAllocator<T>, T> Eq for RcGuard<A, T> {}
impl<A: PoolAllocator<T>, T> Hash for RcGuard<A, T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}
impl<A: PoolAllocator<T>, T> Borrow<Handle<T>> for RcGuard<A, T> {
    #[inline(always)]
    fn borrow(&self) -> &Handle<T> {
        &self.handle
    }
}
impl<A: PoolAllocator<T>, T> AsRef<Handle<T>> for RcGuard<A, T> {
    #[inline(always)]
    fn as_ref(&self) -> &Handle<T> {
        &self.handle
    }
}
