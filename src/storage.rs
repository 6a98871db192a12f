use crate::{Handle, Initializer, PoolAllocator, PoolId};

/// Where an allocated instance currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    Free,
    CheckedOut,
    /// Found invalidated; never handed out or pushed again.
    Retired,
}

/// Outcome of popping the free-list.
pub(crate) enum Popped<T> {
    /// Activated and checked out.
    Live(Handle<T>),
    Invalidated(Handle<T>),
    /// Payload locked by a stale holder; checked out until pushed back.
    Busy(Handle<T>),
    Empty,
}

/// Backing collection of a pool: every instance it allocated and the LIFO
/// free-list. Not synchronized, the owning pool serializes access.
pub(crate) struct PoolStorage<T> {
    pool: PoolId,
    all: Vec<Handle<T>>,
    // indexed by Handle::index, parallel to `all`
    states: Vec<SlotState>,
    free: Vec<Handle<T>>,
    retired: usize,
}

impl<T> PoolStorage<T> {
    pub(crate) fn new(pool: PoolId) -> Self {
        PoolStorage {
            pool,
            all: Vec::new(),
            states: Vec::new(),
            free: Vec::new(),
            retired: 0,
        }
    }

    /// Creates `n` instances and pushes them onto the free-list.
    ///
    /// Instances created before a failing `allocate` call stay in the pool.
    pub(crate) fn allocate<A: PoolAllocator<T>>(
        &mut self,
        n: usize,
        allocator: &A,
        template: Option<&A::Template>,
        initializers: &[Initializer<T>],
    ) -> Result<(), A::Error> {
        self.all.reserve(n);
        self.states.reserve(n);
        self.free.reserve(n);
        for _ in 0..n {
            let mut obj = allocator.allocate(template)?;
            for init in initializers {
                init(&mut obj);
            }
            allocator.deactivate(&mut obj);

            let handle = Handle::new(self.pool, self.all.len(), obj);
            self.all.push(handle.clone());
            self.states.push(SlotState::Free);
            self.free.push(handle);
        }
        Ok(())
    }

    pub(crate) fn pop_free(&mut self) -> Option<Handle<T>> {
        let handle = self.free.pop()?;
        self.states[handle.index()] = SlotState::CheckedOut;
        Some(handle)
    }

    /// Pops the free-list and classifies the result without blocking on the
    /// payload. Live instances are activated, invalidated ones are retired
    /// before being reported.
    pub(crate) fn pop_live<A: PoolAllocator<T>>(&mut self, allocator: &A) -> Popped<T> {
        let Some(handle) = self.pop_free() else {
            return Popped::Empty;
        };
        let destroyed = match handle.try_lock() {
            Some(mut obj) => {
                let destroyed = allocator.is_destroyed(&obj);
                if !destroyed {
                    allocator.activate(&mut obj);
                }
                Some(destroyed)
            }
            None => None,
        };
        match destroyed {
            Some(false) => Popped::Live(handle),
            Some(true) => {
                self.retire(&handle);
                Popped::Invalidated(handle)
            }
            None => Popped::Busy(handle),
        }
    }

    pub(crate) fn push_free(&mut self, handle: Handle<T>) {
        debug_assert!(self.contains(&handle), "pushed a foreign handle");
        debug_assert_eq!(self.state(&handle), Some(SlotState::CheckedOut));
        self.states[handle.index()] = SlotState::Free;
        self.free.push(handle);
    }

    /// Takes a checked-out instance out of circulation for good.
    pub(crate) fn retire(&mut self, handle: &Handle<T>) {
        debug_assert_eq!(self.state(handle), Some(SlotState::CheckedOut));
        self.states[handle.index()] = SlotState::Retired;
        self.retired += 1;
    }

    pub(crate) fn contains(&self, handle: &Handle<T>) -> bool {
        handle.pool_id() == self.pool
            && self
                .all
                .get(handle.index())
                .is_some_and(|own| Handle::ptr_eq(own, handle))
    }

    pub(crate) fn state(&self, handle: &Handle<T>) -> Option<SlotState> {
        if self.contains(handle) {
            Some(self.states[handle.index()])
        } else {
            None
        }
    }

    /// Destroys every instance that is still live and empties the storage.
    ///
    /// Returns the number of instances passed to `destroy`.
    pub(crate) fn teardown<A: PoolAllocator<T>>(&mut self, allocator: &A) -> usize {
        let mut destroyed = 0;
        self.free.clear();
        for (handle, state) in self.all.drain(..).zip(self.states.drain(..)) {
            if state == SlotState::Retired {
                continue;
            }
            let Some(mut obj) = handle.try_lock() else {
                log::warn!(
                    "pooled instance #{} is locked by its holder during teardown, \
                     it will be dropped with its last handle",
                    handle.index()
                );
                continue;
            };
            if !allocator.is_destroyed(&obj) {
                allocator.destroy(&mut obj);
                destroyed += 1;
            }
        }
        self.retired = 0;
        destroyed
    }

    pub(crate) fn handles(&self) -> &[Handle<T>] {
        &self.all
    }

    pub(crate) fn allocated(&self) -> usize {
        self.all.len()
    }

    pub(crate) fn free_len(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn retired(&self) -> usize {
        self.retired
    }
}
