//! thrmgr worker-pool demo
//!
//! Spawns a bounded pool, dispatches a batch of jobs through a job group,
//! prints the live statistics dump while one job is still in flight, then
//! waits for the group and tears the pool down.
//!
//! Usage:
//!     cargo run -p thrmgr-demo

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thrmgr::{printstats, set_active_task, JobGroup, JobOutcome, PoolConfig, ThreadPool, WriteSink};

struct Job {
    id: u32,
    filename: String,
    fail: bool,
    group: Arc<JobGroup>,
}

fn main() {
    tracing_subscriber::fmt::init();

    let completed = Arc::new(AtomicU32::new(0));
    let pool = ThreadPool::new(PoolConfig::new(4, Duration::from_secs(5)), {
        let completed = Arc::clone(&completed);
        move |job: Job| {
            set_active_task(Some(&job.filename), Some("SCAN"));
            std::thread::sleep(Duration::from_millis(150));
            completed.fetch_add(1, Ordering::SeqCst);
            tracing::info!(job = job.id, "job finished");
            job.group.finished(if job.fail { JobOutcome::Error } else { JobOutcome::Ok });
        }
    })
    .expect("max_threads >= 1");

    let group = JobGroup::new();
    for i in 0..6 {
        let job = Job {
            id: i,
            filename: format!("/tmp/sample-{i}.bin"),
            fail: i == 5,
            group: Arc::clone(&group),
        };
        pool.group_dispatch(&group, job);
    }

    std::thread::sleep(Duration::from_millis(60));
    let mut buf = Vec::new();
    printstats(&mut WriteSink(&mut buf)).expect("stats sink write never fails for an in-memory buffer");
    print!("{}", String::from_utf8_lossy(&buf));

    let (ok, err, total) = group.wait_for_all();
    println!("group: ok={ok} error={err} total={total}");

    pool.destroy();
    println!("completed: {}", completed.load(Ordering::SeqCst));
}
