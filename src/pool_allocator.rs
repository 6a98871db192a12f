/// A trait defining the collaborator hooks a pool invokes on its instances.
///
/// The pool itself is agnostic to what "active", "reset" or "destroyed" mean
/// for the payload type; implementors decide. Only [`Self::allocate`] is
/// required, every other hook defaults to a no-op.
pub trait PoolAllocator<T> {
    /// Seed handed to [`Self::allocate`] when the pool was built with a
    /// template. Use `()` when instances need no seed.
    type Template;

    /// Error returned when a new instance cannot be created.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates a new object of type T.
    ///
    /// Failures propagate unchanged to whoever triggered the allocation and
    /// are never retried by the pool.
    fn allocate(&self, template: Option<&Self::Template>) -> Result<T, Self::Error>;

    /// Restores an object to its neutral state. Called on every release,
    /// before [`Self::deactivate`].
    #[inline(always)]
    fn reset(&self, _obj: &mut T) {}

    /// Called when an object is handed out by the pool.
    #[inline(always)]
    fn activate(&self, _obj: &mut T) {}

    /// Called when an object is created and whenever it is returned to the
    /// pool.
    #[inline(always)]
    fn deactivate(&self, _obj: &mut T) {}

    /// Reports whether the object was invalidated outside the pool's control.
    ///
    /// Invalidated objects are retired: they are never handed out again and
    /// are skipped at teardown.
    #[inline(always)]
    fn is_destroyed(&self, _obj: &T) -> bool {
        false
    }

    /// Releases whatever the object holds. Called once per live object when
    /// the pool is disposed.
    #[inline(always)]
    fn destroy(&self, _obj: &mut T) {}
}
