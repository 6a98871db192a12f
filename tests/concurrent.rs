use handlepool::*;
use rayon::prelude::*;
use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

#[derive(Default)]
struct Slot {
    in_use: bool,
    uses: usize,
}

struct SlotAllocator;

impl PoolAllocator<Slot> for SlotAllocator {
    type Template = ();
    type Error = Infallible;

    fn allocate(&self, _template: Option<&()>) -> Result<Slot, Infallible> {
        Ok(Slot::default())
    }

    fn activate(&self, obj: &mut Slot) {
        assert!(!obj.in_use, "instance handed out twice");
        obj.in_use = true;
    }

    fn deactivate(&self, obj: &mut Slot) {
        obj.in_use = false;
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_parallel_acquire_release() {
    init_logger();
    let pool = ObjectPool::builder(SlotAllocator)
        .initial_size(4)
        .growth_batch_size(4)
        .build()
        .unwrap();

    (0..4096).into_par_iter().for_each(|_| {
        let handle = pool.acquire().unwrap().unwrap();
        {
            let mut slot = handle.lock();
            assert!(slot.in_use);
            slot.uses += 1;
        }
        pool.release(&handle).unwrap();
    });

    let stats = pool.stats();
    assert_eq!(stats.checked_out, 0);
    assert_eq!(stats.free, stats.allocated);
    let uses: usize = pool.handles().iter().map(|h| h.lock().uses).sum();
    assert_eq!(uses, 4096);
}

#[test]
fn test_parallel_holders_get_distinct_instances() {
    init_logger();
    let pool = ObjectPool::builder(SlotAllocator)
        .initial_size(8)
        .growth_batch_size(8)
        .build()
        .unwrap();

    let held: Vec<_> = (0..256)
        .into_par_iter()
        .map(|_| pool.acquire().unwrap().unwrap())
        .collect();

    let mut indices: Vec<_> = held.iter().map(Handle::index).collect();
    indices.sort_unstable();
    indices.dedup();
    assert_eq!(indices.len(), 256);
    assert_eq!(pool.stats().checked_out, 256);

    held.par_iter()
        .for_each(|handle| pool.release(handle).unwrap());
    assert_eq!(pool.len(), pool.allocated());
}

#[test]
fn test_fixed_pool_under_contention() {
    init_logger();
    let pool = ObjectPool::builder(SlotAllocator)
        .initial_size(2)
        .dynamic_growth(false)
        .build()
        .unwrap();
    let misses = AtomicUsize::new(0);

    (0..2048).into_par_iter().for_each(|_| match pool.acquire().unwrap() {
        Some(handle) => pool.release(&handle).unwrap(),
        None => {
            misses.fetch_add(1, Ordering::Relaxed);
        }
    });

    assert_eq!(pool.allocated(), 2);
    assert_eq!(pool.len(), 2);
    assert!(misses.load(Ordering::Relaxed) < 2048);
}

#[test]
fn test_dispose_while_in_use() {
    init_logger();
    let pool = ObjectPool::builder(SlotAllocator)
        .initial_size(4)
        .growth_batch_size(2)
        .build()
        .unwrap()
        .to_rc();
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                while !stop.load(Ordering::Relaxed) {
                    match pool.acquire().unwrap() {
                        Some(handle) => assert_eq!(pool.release(&handle), Ok(())),
                        None => assert!(pool.is_disposed()),
                    }
                }
            });
        }
        thread::sleep(std::time::Duration::from_millis(20));
        pool.dispose();
        stop.store(true, Ordering::Relaxed);
    });

    assert!(pool.acquire().unwrap().is_none());
    assert_eq!(pool.stats(), PoolStats::default());
}

#[test]
fn test_rc_guards_across_threads() {
    init_logger();
    let pool = ObjectPool::builder(SlotAllocator)
        .initial_size(1)
        .growth_batch_size(1)
        .build()
        .unwrap()
        .to_rc();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..100 {
                    let guard = pool.clone().get_rc().unwrap().unwrap();
                    guard.lock().uses += 1;
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.checked_out, 0);
    assert!(stats.allocated <= 8);
    let uses: usize = pool.handles().iter().map(|h| h.lock().uses).sum();
    assert_eq!(uses, 800);
}

#[test]
fn test_payload_lock_does_not_stall_the_pool() {
    init_logger();
    let pool = ObjectPool::builder(SlotAllocator)
        .initial_size(2)
        .dynamic_growth(false)
        .build()
        .unwrap();
    let handle = pool.acquire().unwrap().unwrap();
    let held = handle.lock();

    thread::scope(|s| {
        let released = s.spawn(|| pool.release(&handle)).join().unwrap();
        assert_eq!(
            released,
            Err(ReleaseError::PayloadLocked {
                index: handle.index()
            })
        );

        let other = s
            .spawn(|| pool.acquire().unwrap().map(|h| h.index()))
            .join()
            .unwrap();
        assert!(other.is_some_and(|index| index != handle.index()));

        s.spawn(|| pool.dispose()).join().unwrap();
    });

    assert!(pool.is_disposed());
    assert!(held.in_use);
    drop(held);
    assert_eq!(pool.release(&handle), Ok(()));
}
