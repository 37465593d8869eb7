use crate::executor::WorkerPool;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

#[test]
fn runs_every_task_then_hook() {
    const TASKS: RangeInclusive<usize> = 0..=10;

    for tasks in TASKS {
        let mut pool = WorkerPool::new("test");
        for i in 0..tasks {
            pool.push(move || i * 2);
        }
        assert_eq!(tasks, pool.len());
        assert!(!pool.is_started());

        let completed = Arc::new(AtomicBool::new(false));
        {
            let completed = completed.clone();
            pool.start(move || completed.store(true, Ordering::Release)).unwrap();
        }
        assert!(pool.is_started());
        assert_eq!(0, pool.len());

        let completion = pool.await_completion().unwrap();
        assert!(completed.load(Ordering::Acquire));
        assert_eq!(0, completion.panicked);
        let mut results = completion.results;
        results.sort_unstable();
        assert_eq!((0..tasks).map(|i| i * 2).collect::<Vec<_>>(), results);

        // a second await has nothing left to join
        assert!(pool.await_completion().is_none());
    }
}

#[test]
fn hook_waits_for_every_task() {
    const TASKS: usize = 4;
    let release = Arc::new(Barrier::new(TASKS + 1));
    let finished = Arc::new(AtomicUsize::new(0));
    let finished_at_hook = Arc::new(AtomicUsize::new(usize::MAX));

    let mut pool = WorkerPool::new("barrier");
    for _ in 0..TASKS {
        let release = release.clone();
        let finished = finished.clone();
        pool.push(move || {
            release.wait();
            finished.fetch_add(1, Ordering::AcqRel);
        });
    }
    {
        let finished = finished.clone();
        let finished_at_hook = finished_at_hook.clone();
        pool.start(move || finished_at_hook.store(finished.load(Ordering::Acquire), Ordering::Release))
            .unwrap();
    }

    // every task is parked on the barrier; the hook cannot have run
    assert_eq!(usize::MAX, finished_at_hook.load(Ordering::Acquire));
    release.wait();
    pool.await_completion().unwrap();
    assert_eq!(TASKS, finished_at_hook.load(Ordering::Acquire));
}

#[test]
fn panicking_task_is_counted() {
    let mut pool = WorkerPool::new("panicky");
    pool.push(|| 1);
    pool.push(|| panic!("boom"));
    pool.start(|| {}).unwrap();
    let completion = pool.await_completion().unwrap();
    assert_eq!(vec![1], completion.results);
    assert_eq!(1, completion.panicked);
}

#[test]
fn unstarted_pool_has_nothing_to_await() {
    let mut pool = WorkerPool::<()>::new("idle");
    pool.push(|| ());
    assert!(pool.await_completion().is_none());
    assert_eq!(1, pool.len());
}

#[test]
fn push_after_start_is_ignored() {
    let mut pool = WorkerPool::new("late");
    pool.start(|| {}).unwrap();
    pool.push(|| 1);
    assert!(pool.is_empty());
    assert!(pool.await_completion().unwrap().results.is_empty());
}

#[test]
fn drop_joins_started_pool() {
    let ran = Arc::new(AtomicBool::new(false));
    {
        let mut pool = WorkerPool::new("dropped");
        let ran = ran.clone();
        pool.push(move || ran.store(true, Ordering::Release));
        pool.start(|| {}).unwrap();
    }
    assert!(ran.load(Ordering::Acquire));
}
