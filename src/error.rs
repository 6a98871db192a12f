use crate::PoolId;
use thiserror::Error;

/// Rejected pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Dynamic growth is enabled but the growth batch is empty.
    #[error("growth batch size must be greater than 0 when dynamic growth is enabled")]
    ZeroGrowthBatch,

    /// The pool could never hand out an instance.
    #[error("initial size must be greater than 0 when dynamic growth is disabled")]
    ZeroInitialSize,
}

/// Failure while constructing a pool.
#[derive(Debug, Error)]
pub enum BuildError<E> {
    /// The configuration was rejected before anything was allocated.
    #[error("invalid pool configuration")]
    Config(#[from] ConfigError),

    /// Creating the initial batch of instances failed.
    #[error("failed to allocate the initial pool")]
    Allocation(#[source] E),
}

/// Reason [`crate::ObjectPool::try_acquire`] produced no instance.
#[derive(Debug, Error)]
pub enum AcquireError<E> {
    /// The pool was disposed.
    #[error("pool has been disposed")]
    Disposed,

    /// The free-list is empty and the pool may not grow.
    #[error("pool exhausted: all {allocated} instances are in use and dynamic growth is disabled")]
    Exhausted {
        /// Number of instances the pool has allocated so far.
        allocated: usize,
    },

    /// Growing the pool failed.
    #[error("failed to allocate pooled instance")]
    Allocation(#[source] E),
}

/// Protocol violation detected by [`crate::ObjectPool::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReleaseError {
    /// The handle was allocated by a different pool.
    #[error("handle belongs to pool {owner}, not to pool {pool}")]
    ForeignHandle {
        /// Pool that allocated the handle.
        owner: PoolId,
        /// Pool the handle was released to.
        pool: PoolId,
    },

    /// The handle is already on the free-list.
    #[error("instance #{index} was released twice")]
    DoubleRelease {
        /// Allocation index of the instance.
        index: usize,
    },

    /// The payload is locked by a holder; the instance stays checked out.
    #[error("instance #{index} is locked by its holder and cannot be released")]
    PayloadLocked {
        /// Allocation index of the instance.
        index: usize,
    },
}
