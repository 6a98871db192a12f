use handlepool::*;
use std::convert::Infallible;

struct SimpleAllocator;

impl PoolAllocator<Box<usize>> for SimpleAllocator {
    type Template = ();
    type Error = Infallible;

    fn allocate(&self, _template: Option<&()>) -> Result<Box<usize>, Infallible> {
        Ok(Box::new(10))
    }

    fn reset(&self, obj: &mut Box<usize>) {
        **obj = 10;
    }
}

fn pool() -> ObjectPool<SimpleAllocator, Box<usize>> {
    ObjectPool::builder(SimpleAllocator)
        .initial_size(10)
        .dynamic_growth(false)
        .build()
        .unwrap()
}

#[test]
fn test_get() {
    let pool = pool();
    let guard = pool.get().unwrap().unwrap();
    assert_eq!(**guard.lock(), 10);
    assert_eq!(pool.len(), 9);
}

#[test]
fn test_get_releases_on_drop() {
    let pool = pool();
    let first = {
        let guard = pool.get().unwrap().unwrap();
        **guard.lock() = 99;
        Handle::clone(&guard)
    };
    assert_eq!(pool.len(), 10);
    assert_eq!(**first.lock(), 10);

    let again = pool.get().unwrap().unwrap();
    assert_eq!(*again, first);
}

#[test]
fn test_get_into_inner() {
    let pool = pool();
    let handle = pool.get().unwrap().unwrap().into_inner();
    assert_eq!(**handle.lock(), 10);
    assert_eq!(pool.len(), 9);

    pool.release(&handle).unwrap();
    assert_eq!(pool.len(), 10);
}

#[test]
fn test_get_release_reports_violations() {
    let pool = pool();
    let guard = pool.get().unwrap().unwrap();
    pool.release(&guard).unwrap();

    assert!(matches!(
        guard.release(),
        Err(ReleaseError::DoubleRelease { .. })
    ));
    assert_eq!(pool.len(), 10);
}

#[test]
fn test_get_exhausted() {
    let pool = pool();
    let guards: Vec<_> = (0..10).map(|_| pool.get().unwrap().unwrap()).collect();
    assert!(pool.get().unwrap().is_none());
    drop(guards);
    assert_eq!(pool.len(), 10);
}

#[test]
fn test_get_rc() {
    let pool = pool().to_rc();
    let guard = pool.clone().get_rc().unwrap().unwrap();
    assert_eq!(**guard.lock(), 10);
    assert_eq!(guard.pool().id(), pool.id());
    drop(guard);
    assert_eq!(pool.len(), 10);
}

#[test]
fn test_get_rc_into_inner() {
    let pool = pool().to_rc();
    let handle = pool.clone().get_rc().unwrap().unwrap().into_inner();
    assert_eq!(**handle.lock(), 10);
    assert_eq!(pool.len(), 9);
}

#[test]
fn test_get_rc_outlives_dispose() {
    let pool = pool().to_rc();
    let guard = pool.clone().get_rc().unwrap().unwrap();
    pool.dispose();
    // releasing into a disposed pool is a no-op
    drop(guard);
    assert!(pool.is_disposed());
    assert!(pool.clone().get_rc().unwrap().is_none());
}
