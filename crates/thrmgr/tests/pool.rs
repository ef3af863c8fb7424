//! Cross-module concurrency scenarios, exercised over the public API.
//! A process has one registry singleton, so these live together here rather
//! than split per unit-test module.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use thrmgr::{
    printstats, set_active_task, JobGroup, JobOutcome, PoolConfig, ThreadPool, WriteSink,
};

#[test]
fn group_barrier_tallies_ok_and_error() {
    let group = JobGroup::new();
    let pool = ThreadPool::new(PoolConfig::new(4, Duration::from_secs(30)), {
        let group = Arc::clone(&group);
        move |should_fail: bool| {
            if should_fail {
                group.finished(JobOutcome::Error);
            } else {
                group.finished(JobOutcome::Ok);
            }
        }
    })
    .unwrap();

    for i in 0..10 {
        assert!(pool.group_dispatch(&group, i >= 7));
    }
    let (ok, error, total) = group.wait_for_all();
    assert_eq!((ok, error, total), (7, 3, 10));
    pool.destroy();
}

#[test]
fn stats_dump_reports_queue_and_task_lines() {
    // One worker blocks on a barrier so it stays "running" with a known
    // command/filename while we snapshot; a second item sits queued.
    let barrier = Arc::new(Barrier::new(2));
    let worker_barrier = Arc::clone(&barrier);

    let pool = ThreadPool::new(PoolConfig::new(4, Duration::from_secs(30)), move |_: u32| {
        set_active_task(Some("/a"), Some("SCAN"));
        worker_barrier.wait();
        // Hold here until the test thread has read the dump.
        std::thread::sleep(Duration::from_millis(300));
    })
    .unwrap();

    assert!(pool.dispatch(1));
    barrier.wait(); // first item is now running with command=SCAN filename=/a
    assert!(pool.dispatch(2)); // second item sits in queue

    std::thread::sleep(Duration::from_millis(20));

    let mut buf: Vec<u8> = Vec::new();
    printstats(&mut WriteSink(&mut buf)).unwrap();
    let text = String::from_utf8(buf).unwrap();

    assert!(text.contains("POOLS:"));
    assert!(text.contains("THREADS: live"));
    assert!(text.contains("QUEUE: 1 items"));
    assert!(text.contains("SCAN"));
    assert!(text.contains("/a"));
    assert!(text.trim_end().ends_with("END"));

    pool.destroy();
}

#[test]
fn destroy_races_dispatch_without_deadlock_or_leak() {
    let pool = ThreadPool::new(PoolConfig::new(4, Duration::from_millis(50)), |_: ()| {
        std::thread::sleep(Duration::from_millis(5));
    })
    .unwrap();

    let success = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        let success = Arc::clone(&success);
        handles.push(std::thread::spawn(move || {
            if pool.dispatch(()) {
                success.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }
    pool.destroy();
    for h in handles {
        h.join().unwrap();
    }
    // No deadlock above is the primary assertion; every successful dispatch
    // must have had its handler invoked before `destroy` returned, which
    // `destroy`'s drain-to-zero wait already guarantees.
    assert!(success.load(Ordering::Relaxed) <= 8);
}

#[test]
fn max_threads_one_serializes_two_items() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let o = Arc::clone(&order);
    let pool = ThreadPool::new(PoolConfig::new(1, Duration::from_secs(30)), move |id: u32| {
        o.lock().unwrap().push(id);
        std::thread::sleep(Duration::from_millis(15));
    })
    .unwrap();
    pool.dispatch(1);
    pool.dispatch(2);
    pool.destroy();
    assert_eq!(*order.lock().unwrap(), vec![1, 2]);
}
