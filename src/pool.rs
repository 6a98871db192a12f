use crate::{
    storage::{PoolStorage, Popped, SlotState},
    AcquireError, BuildError, Handle, PoolAllocator, PoolConfig, PoolId, RcGuard, RefGuard,
    ReleaseError,
};
use parking_lot::Mutex;
use std::{fmt, sync::Arc};

/// Setup action applied exactly once to every newly created instance.
pub type Initializer<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Lifecycle of a pool. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Serving acquire and release.
    Active,
    /// Torn down; acquire yields nothing and release is a no-op.
    Disposed,
}

/// Point-in-time counters of a pool.
///
/// `free + checked_out + retired == allocated` holds for every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Instances allocated and not yet torn down.
    pub allocated: usize,
    /// Instances on the free-list.
    pub free: usize,
    /// Instances currently held by callers.
    pub checked_out: usize,
    /// Instances found invalidated and taken out of circulation.
    pub retired: usize,
}

struct Inner<T> {
    storage: PoolStorage<T>,
    state: PoolState,
}

impl<T> Inner<T> {
    fn dispose<A: PoolAllocator<T>>(&mut self, allocator: &A, id: PoolId) {
        if self.state == PoolState::Disposed {
            return;
        }
        let allocated = self.storage.allocated();
        let destroyed = self.storage.teardown(allocator);
        self.state = PoolState::Disposed;
        log::debug!("pool {id} disposed, destroyed {destroyed} of {allocated} instances");
    }
}

/// A thread-safe pool of reusable instances handed out as [`Handle`]s.
///
/// Free instances are kept on a LIFO stack, so the most recently released
/// instance is the next one acquired. Every storage mutation and the
/// transition to [`PoolState::Disposed`] happen under a single lock.
///
/// Dropping the pool disposes it.
pub struct ObjectPool<A: PoolAllocator<T>, T> {
    id: PoolId,
    allocator: A,
    config: PoolConfig,
    template: Option<A::Template>,
    initializers: Vec<Initializer<T>>,
    inner: Mutex<Inner<T>>,
}

impl<A: PoolAllocator<T>, T> ObjectPool<A, T> {
    /// Creates a pool with the given configuration and allocates its
    /// initial instances.
    ///
    /// Use [`Self::builder`] to also provide a template or initializers.
    pub fn new(config: PoolConfig, allocator: A) -> Result<Self, BuildError<A::Error>> {
        Self::builder(allocator).config(config).build()
    }

    /// Starts building a pool around `allocator` with the default
    /// configuration.
    pub fn builder(allocator: A) -> PoolBuilder<A, T> {
        PoolBuilder {
            allocator,
            config: PoolConfig::default(),
            template: None,
            initializers: Vec::new(),
        }
    }

    /// Wraps the pool with an atomic reference counter, enabling the use of
    /// [`Self::get_rc`] to obtain guards that own a reference to the pool.
    pub fn to_rc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Acquires an instance.
    ///
    /// Returns `Ok(None)` when the pool is disposed or exhausted with growth
    /// disabled; the reason is logged. Use [`Self::try_acquire`] to receive
    /// it instead. Allocation failures while growing are returned as errors.
    pub fn acquire(&self) -> Result<Option<Handle<T>>, A::Error> {
        match self.try_acquire() {
            Ok(handle) => Ok(Some(handle)),
            Err(AcquireError::Disposed | AcquireError::Exhausted { .. }) => Ok(None),
            Err(AcquireError::Allocation(err)) => Err(err),
        }
    }

    /// Acquires an instance, reporting why none could be handed out.
    ///
    /// Instances found invalidated on the free-list are retired and skipped.
    /// Free instances whose payload is locked through a stale handle are
    /// skipped without waiting and stay on the free-list. When the free-list
    /// runs dry and growth is enabled, one batch of
    /// [`PoolConfig::growth_batch_size`] instances is allocated per call.
    pub fn try_acquire(&self) -> Result<Handle<T>, AcquireError<A::Error>> {
        let mut inner = self.inner.lock();
        if inner.state == PoolState::Disposed {
            log::debug!("acquire on disposed pool {} ignored", self.id);
            return Err(AcquireError::Disposed);
        }

        let mut busy = Vec::new();
        let result = self.acquire_locked(&mut inner, &mut busy);
        // restore the original stack order
        for handle in busy.into_iter().rev() {
            inner.storage.push_free(handle);
        }
        result
    }

    fn acquire_locked(
        &self,
        inner: &mut Inner<T>,
        busy: &mut Vec<Handle<T>>,
    ) -> Result<Handle<T>, AcquireError<A::Error>> {
        let mut grown = false;
        loop {
            match inner.storage.pop_live(&self.allocator) {
                Popped::Live(handle) => {
                    log::trace!("pool {}: acquired instance #{}", self.id, handle.index());
                    return Ok(handle);
                }
                Popped::Invalidated(handle) => {
                    log::error!(
                        "pool {}: instance #{} was destroyed outside the pool, \
                         pooled instances must only be destroyed by their pool",
                        self.id,
                        handle.index()
                    );
                }
                Popped::Busy(handle) => {
                    log::warn!(
                        "pool {}: free instance #{} is locked through a stale handle, skipping it",
                        self.id,
                        handle.index()
                    );
                    busy.push(handle);
                }
                Popped::Empty if self.config.enable_dynamic_growth && !grown => {
                    let batch = self.config.growth_batch_size;
                    inner
                        .storage
                        .allocate(
                            batch,
                            &self.allocator,
                            self.template.as_ref(),
                            &self.initializers,
                        )
                        .map_err(AcquireError::Allocation)?;
                    grown = true;
                    log::debug!(
                        "pool {} grew by {batch} to {} instances",
                        self.id,
                        inner.storage.allocated()
                    );
                }
                Popped::Empty => {
                    let allocated = inner.storage.allocated();
                    if self.config.enable_dynamic_growth {
                        log::warn!(
                            "pool {}: no live instance after growing to {allocated}",
                            self.id
                        );
                    } else {
                        log::warn!(
                            "pool {}: all {allocated} instances are in use and dynamic growth is disabled",
                            self.id
                        );
                    }
                    return Err(AcquireError::Exhausted { allocated });
                }
            }
        }
    }

    /// Returns an instance to the pool.
    ///
    /// The instance is reset and deactivated, then pushed onto the free-list.
    /// Releasing to a disposed pool, or releasing an instance whose payload
    /// was invalidated, does nothing. The pool never waits on a payload: if
    /// a guard obtained from [`Handle::lock`] is still alive the release
    /// fails with [`ReleaseError::PayloadLocked`] and the instance stays
    /// checked out.
    pub fn release(&self, handle: &Handle<T>) -> Result<(), ReleaseError> {
        let mut inner = self.inner.lock();
        if inner.state == PoolState::Disposed {
            log::debug!("release on disposed pool {} ignored", self.id);
            return Ok(());
        }

        match inner.storage.state(handle) {
            None => {
                let err = ReleaseError::ForeignHandle {
                    owner: handle.pool_id(),
                    pool: self.id,
                };
                log::error!("protocol violation: {err}");
                Err(err)
            }
            Some(SlotState::Free) => {
                let err = ReleaseError::DoubleRelease {
                    index: handle.index(),
                };
                log::error!("protocol violation in pool {}: {err}", self.id);
                Err(err)
            }
            Some(SlotState::Retired) => Ok(()),
            Some(SlotState::CheckedOut) => {
                let destroyed = match handle.try_lock() {
                    Some(mut obj) => {
                        let destroyed = self.allocator.is_destroyed(&obj);
                        if !destroyed {
                            self.allocator.reset(&mut obj);
                            self.allocator.deactivate(&mut obj);
                        }
                        destroyed
                    }
                    None => {
                        let err = ReleaseError::PayloadLocked {
                            index: handle.index(),
                        };
                        log::warn!("pool {}: {err}", self.id);
                        return Err(err);
                    }
                };
                if destroyed {
                    log::warn!(
                        "pool {}: released instance #{} was destroyed outside the pool, retiring it",
                        self.id,
                        handle.index()
                    );
                    inner.storage.retire(handle);
                } else {
                    log::trace!("pool {}: released instance #{}", self.id, handle.index());
                    inner.storage.push_free(handle.clone());
                }
                Ok(())
            }
        }
    }

    /// Tears the pool down, destroying every live instance.
    ///
    /// Idempotent. Calls racing with disposal observe the disposed state
    /// afterwards. Instances whose payload is locked by a caller at that
    /// moment are not passed to [`PoolAllocator::destroy`].
    pub fn dispose(&self) {
        self.inner.lock().dispose(&self.allocator, self.id);
    }

    /// Acquires an instance wrapped in a guard that releases it on drop.
    pub fn get(&self) -> Result<Option<RefGuard<'_, A, T>>, A::Error> {
        Ok(self.acquire()?.map(|handle| RefGuard::new(handle, self)))
    }

    /// Acquires an instance wrapped in a guard that holds an arc reference
    /// to the pool, so it is not bound to the pool's lifetime.
    pub fn get_rc(self: Arc<Self>) -> Result<Option<RcGuard<A, T>>, A::Error> {
        Ok(self.acquire()?.map(|handle| RcGuard::new(handle, &self)))
    }

    /// Identifier shared by every handle this pool allocates.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// The collaborator the pool invokes its hooks on.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    /// Returns true once [`Self::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.state() == PoolState::Disposed
    }

    /// Gets the number of instances ready to be acquired without growing.
    pub fn len(&self) -> usize {
        self.inner.lock().storage.free_len()
    }

    /// Returns true if no instance can be acquired without growing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the number of instances allocated so far.
    pub fn allocated(&self) -> usize {
        self.inner.lock().storage.allocated()
    }

    /// Snapshot of the pool's counters, taken under the lock.
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        let storage = &inner.storage;
        PoolStats {
            allocated: storage.allocated(),
            free: storage.free_len(),
            checked_out: storage.allocated() - storage.free_len() - storage.retired(),
            retired: storage.retired(),
        }
    }

    /// Snapshot of every allocated handle, in allocation order.
    ///
    /// Includes free, checked-out and retired instances. Locking a payload
    /// that is checked out by someone else blocks until they let go.
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.inner.lock().storage.handles().to_vec()
    }
}

impl<A: PoolAllocator<T>, T> Drop for ObjectPool<A, T> {
    fn drop(&mut self) {
        self.inner.get_mut().dispose(&self.allocator, self.id);
    }
}

impl<A: PoolAllocator<T>, T> fmt::Debug for ObjectPool<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("has_template", &self.template.is_some())
            .field("initializers", &self.initializers.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ObjectPool`], created by [`ObjectPool::builder`].
pub struct PoolBuilder<A: PoolAllocator<T>, T> {
    allocator: A,
    config: PoolConfig,
    template: Option<A::Template>,
    initializers: Vec<Initializer<T>>,
}

impl<A: PoolAllocator<T>, T> PoolBuilder<A, T> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of instances allocated up front.
    pub fn initial_size(mut self, initial_size: usize) -> Self {
        self.config.initial_size = initial_size;
        self
    }

    /// Enables or disables dynamic growth.
    pub fn dynamic_growth(mut self, enabled: bool) -> Self {
        self.config.enable_dynamic_growth = enabled;
        self
    }

    /// Sets the number of instances allocated per growth event.
    pub fn growth_batch_size(mut self, growth_batch_size: usize) -> Self {
        self.config.growth_batch_size = growth_batch_size;
        self
    }

    /// Sets the template passed to [`PoolAllocator::allocate`].
    pub fn template(mut self, template: A::Template) -> Self {
        self.template = Some(template);
        self
    }

    /// Appends an initializer. Initializers run in insertion order, once per
    /// created instance, before it is deactivated.
    pub fn initializer<F>(mut self, init: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.initializers.push(Box::new(init));
        self
    }

    /// Validates the configuration and allocates the initial instances.
    pub fn build(self) -> Result<ObjectPool<A, T>, BuildError<A::Error>> {
        self.config.validate()?;

        let id = PoolId::next();
        let mut storage = PoolStorage::new(id);
        if let Err(err) = storage.allocate(
            self.config.initial_size,
            &self.allocator,
            self.template.as_ref(),
            &self.initializers,
        ) {
            let destroyed = storage.teardown(&self.allocator);
            log::error!("pool {id}: initial allocation failed, destroyed {destroyed} instances");
            return Err(BuildError::Allocation(err));
        }
        log::debug!(
            "pool {id} created with {} instances (dynamic growth: {})",
            self.config.initial_size,
            self.config.enable_dynamic_growth
        );

        Ok(ObjectPool {
            id,
            allocator: self.allocator,
            config: self.config,
            template: self.template,
            initializers: self.initializers,
            inner: Mutex::new(Inner {
                storage,
                state: PoolState::Active,
            }),
        })
    }
}

impl<A: PoolAllocator<T>, T> fmt::Debug for PoolBuilder<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("config", &self.config)
            .field("has_template", &self.template.is_some())
            .field("initializers", &self.initializers.len())
            .finish_non_exhaustive()
    }
}
