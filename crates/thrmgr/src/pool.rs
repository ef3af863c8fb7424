//! Bounded thread pool.
//!
//! Owns the work queue, the task-descriptor list, and worker-count
//! bookkeeping behind one mutex, plus two condition variables: `pool_cond`
//! (work arriving or the pool shutting down) and `idle_cond` (a worker just
//! went idle — not exposed as a public wait, but signalled for observers).

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{ThrMgrError, ThrMgrResult};
use crate::platform;
use crate::queue::WorkQueue;
use crate::registry::{self, PoolIntrospect, StatsSink};
use crate::task::{self, TaskDescriptor, IDLE};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Pre-init / post-teardown sentinel. Never observed on a live pool
    /// handed back by `ThreadPool::new`; kept so the registry dump's
    /// state-name table has a name for a pool that never finished
    /// constructing.
    Invalid,
    /// Accepts dispatch.
    Valid,
    /// Shutting down; draining workers.
    Exit,
}

impl PoolState {
    fn name(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Valid => "VALID",
            Self::Exit => "EXIT",
        }
    }
}

/// Construction input. The only fallible input is `max_threads == 0`.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_threads: usize,
    pub idle_timeout: Duration,
}

impl PoolConfig {
    pub fn new(max_threads: usize, idle_timeout: Duration) -> Self {
        Self { max_threads, idle_timeout }
    }

    fn validate(&self) -> ThrMgrResult<()> {
        if self.max_threads == 0 {
            return Err(ThrMgrError::InvalidConfig);
        }
        Ok(())
    }
}

struct Shared<T> {
    state: PoolState,
    queue: WorkQueue<T>,
    tasks: Vec<Arc<TaskDescriptor>>,
    thr_alive: usize,
    thr_idle: usize,
}

/// A bounded pool of long-lived worker threads draining a shared FIFO queue.
///
/// `T` is the opaque per-item payload type; the handler supplied at
/// construction is the only thing that interprets it.
pub struct ThreadPool<T> {
    id: u64,
    inner: Mutex<Shared<T>>,
    pool_cond: Condvar,
    idle_cond: Condvar,
    thr_max: usize,
    idle_timeout: Duration,
    handler: Arc<dyn Fn(T) + Send + Sync>,
    stack_size: Option<usize>,
}

impl<T: Send + 'static> ThreadPool<T> {
    /// Constructs a pool and self-registers it with the process-wide
    /// registry so `printstats` can find it. Fails only if
    /// `config.max_threads == 0`.
    pub fn new(
        config: PoolConfig,
        handler: impl Fn(T) + Send + Sync + 'static,
    ) -> ThrMgrResult<Arc<Self>> {
        config.validate()?;
        let stack_size = platform::worker_stack_size();
        if let Some(size) = stack_size {
            tracing::debug!(size, "raising worker stack size for this platform");
        }
        let pool = Arc::new(Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            inner: Mutex::new(Shared {
                state: PoolState::Valid,
                queue: WorkQueue::new(),
                tasks: Vec::new(),
                thr_alive: 0,
                thr_idle: 0,
            }),
            pool_cond: Condvar::new(),
            idle_cond: Condvar::new(),
            thr_max: config.max_threads,
            idle_timeout: config.idle_timeout,
            handler: Arc::new(handler),
            stack_size,
        });
        registry::register(pool.clone() as Arc<dyn PoolIntrospect>);
        Ok(pool)
    }

    fn lock_or_fatal(&self) -> MutexGuard<'_, Shared<T>> {
        self.inner.lock().unwrap_or_else(|_| {
            tracing::error!(pool = self.id, "pool mutex poisoned by a panicking worker");
            std::process::exit(-2);
        })
    }

    /// Enqueues `data` and, if no idle worker can absorb it and there is
    /// spawn headroom, starts exactly one new worker. Returns `true` on
    /// successful enqueue; `false` if the pool is not `Valid`.
    pub fn dispatch(self: &Arc<Self>, data: T) -> bool {
        let mut guard = self.lock_or_fatal();
        if guard.state != PoolState::Valid {
            return false;
        }
        guard.queue.push(data);
        if guard.thr_idle < guard.queue.len() && guard.thr_alive < self.thr_max {
            match self.spawn_worker() {
                Ok(()) => guard.thr_alive += 1,
                Err(e) => {
                    tracing::warn!(pool = self.id, error = %e, "failed to spawn worker thread; queued item will be picked up by an existing worker");
                }
            }
        }
        self.pool_cond.notify_one();
        true
    }

    /// Dispatches `data` as part of `group`, incrementing its outstanding
    /// count first and rolling back on dispatch failure. Holding the
    /// group's lock across the `dispatch` call is what prevents a
    /// concurrent `wait_for_all` from observing `jobs == 0` between the
    /// increment and a successful enqueue.
    pub fn group_dispatch(self: &Arc<Self>, group: &Arc<crate::group::JobGroup>, data: T) -> bool {
        let mut tallies = group.lock_tallies();
        tallies.jobs += 1;
        let ok = self.dispatch(data);
        if !ok {
            tallies.jobs -= 1;
        }
        ok
    }

    fn spawn_worker(self: &Arc<Self>) -> io::Result<()> {
        let pool = Arc::clone(self);
        let mut builder = std::thread::Builder::new().name(format!("thrmgr-worker-{}", self.id));
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        // Detached: the JoinHandle is dropped immediately. `thr_alive`
        // bookkeeping under the lock is how the pool learns of exit.
        builder.spawn(move || pool.worker_loop())?;
        Ok(())
    }

    fn worker_loop(self: Arc<Self>) {
        let descriptor = TaskDescriptor::new();
        task::publish(Arc::clone(&descriptor));
        {
            let mut guard = self.lock_or_fatal();
            guard.tasks.insert(0, Arc::clone(&descriptor));
        }

        let mut must_exit = false;
        loop {
            let mut guard = self.lock_or_fatal();
            descriptor.set_active_engine(None);
            descriptor.set_active_task(None, Some(IDLE));
            let deadline = Instant::now() + self.idle_timeout;
            guard.thr_idle += 1;
            self.idle_cond.notify_one();

            let mut timed_out = false;
            while guard.queue.is_empty() && guard.state != PoolState::Exit {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let (g2, result) = self
                    .pool_cond
                    .wait_timeout(guard, remaining)
                    .unwrap_or_else(|_| {
                        tracing::error!(pool = self.id, "pool mutex poisoned by a panicking worker");
                        std::process::exit(-2);
                    });
                guard = g2;
                if result.timed_out() {
                    timed_out = true;
                    break;
                }
            }
            if timed_out {
                must_exit = true;
            }

            guard.thr_idle -= 1;
            let popped = guard.queue.pop();
            if guard.state == PoolState::Exit {
                must_exit = true;
            }
            drop(guard);

            if let Some(item) = popped {
                (self.handler)(item);
            } else if must_exit {
                break;
            }
        }

        let mut guard = self.lock_or_fatal();
        guard.thr_alive -= 1;
        if guard.thr_alive == 0 {
            self.pool_cond.notify_all();
        }
        guard.tasks.retain(|d| !Arc::ptr_eq(d, &descriptor));
        drop(guard);
        task::clear();
    }

    /// Idempotent shutdown: transitions to `Exit`, wakes every worker, and
    /// blocks until the last one has drained (the last exiting worker
    /// broadcasts `pool_cond`). A no-op if the pool is already shutting
    /// down or was never valid.
    pub fn destroy(self: &Arc<Self>) {
        let mut guard = self.lock_or_fatal();
        if guard.state != PoolState::Valid {
            return;
        }
        guard.state = PoolState::Exit;
        if guard.thr_alive > 0 {
            self.pool_cond.notify_all();
        }
        while guard.thr_alive > 0 {
            guard = self.pool_cond.wait(guard).unwrap_or_else(|_| {
                tracing::error!(pool = self.id, "pool mutex poisoned while draining workers");
                std::process::exit(-2);
            });
        }
        drop(guard);
        registry::unregister(self.id);
    }

    pub fn thr_alive(&self) -> usize {
        self.lock_or_fatal().thr_alive
    }

    pub fn thr_idle(&self) -> usize {
        self.lock_or_fatal().thr_idle
    }

    pub fn thr_max(&self) -> usize {
        self.thr_max
    }

    pub fn queue_len(&self) -> usize {
        self.lock_or_fatal().queue.len()
    }
}

impl<T> Drop for ThreadPool<T> {
    fn drop(&mut self) {
        registry::unregister(self.id);
    }
}

impl<T: Send + 'static> PoolIntrospect for ThreadPool<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn dump(
        &self,
        sink: &mut dyn StatsSink,
        is_primary: bool,
        seen: &mut Vec<Arc<dyn crate::task::EngineMemInfo>>,
    ) -> io::Result<(u64, u64, u32)> {
        let guard = self.lock_or_fatal();
        let now = Instant::now();

        sink.write_line(&format!(
            "STATE: {} {}",
            guard.state.name(),
            if is_primary { "PRIMARY" } else { "" }
        ))?;
        sink.write_line(&format!(
            "THREADS: live {}  idle {} max {} idle-timeout {}",
            guard.thr_alive,
            guard.thr_idle,
            self.thr_max,
            self.idle_timeout.as_secs()
        ))?;

        let mut line = format!("QUEUE: {} items", guard.queue.len());
        let mut valid = 0u32;
        let mut invalid = 0u32;
        let mut min_wait = f64::MAX;
        let mut max_wait = 0.0f64;
        let mut sum_wait = 0.0f64;
        if !guard.queue.is_empty() {
            for item in guard.queue.iter() {
                // `Instant` is monotonic within a process, so this can
                // never actually fire; kept as the same defensive
                // clock-skew handling a wall-clock timestamp source
                // would need.
                match now.checked_duration_since(item.arrival) {
                    Some(delta) => {
                        let secs = delta.as_secs_f64();
                        min_wait = min_wait.min(secs);
                        max_wait = max_wait.max(secs);
                        sum_wait += secs;
                        valid += 1;
                    }
                    None => invalid += 1,
                }
            }
            if valid > 0 {
                line.push_str(&format!(
                    " min_wait: {:.6} max_wait: {:.6} avg_wait: {:.6}",
                    min_wait,
                    max_wait,
                    sum_wait / valid as f64
                ));
            }
            if invalid > 0 {
                line.push_str(&format!(" (INVALID timestamps: {invalid})"));
            }
        }
        if (valid + invalid) as usize != guard.queue.len() {
            line.push_str(&format!(" (ERROR: {} != {})", valid + invalid, guard.queue.len()));
        }
        sink.write_line(&line)?;

        let mut pool_used = 0u64;
        let mut pool_total = 0u64;
        let mut pool_cnt = 0u32;
        for task in guard.tasks.iter() {
            let snap = task.snapshot();
            let elapsed = now.saturating_duration_since(snap.started_at).as_secs_f64();
            sink.write_line(&format!(
                "\t{} {:.6} {}",
                snap.command.unwrap_or("N/A"),
                elapsed,
                snap.filename.as_deref().unwrap_or("")
            ))?;
            if let Some(engine) = snap.engine {
                let first_occurrence = !seen.iter().any(|e| Arc::ptr_eq(e, &engine));
                if first_occurrence {
                    seen.push(Arc::clone(&engine));
                    if let Some((used, total)) = engine.mem_stats() {
                        pool_used += used;
                        pool_total += total;
                        pool_cnt += 1;
                    }
                }
            }
        }
        sink.write_line("")?;
        Ok((pool_used, pool_total, pool_cnt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn rejects_zero_max_threads() {
        let result = ThreadPool::new(PoolConfig::new(0, Duration::from_secs(1)), |_: ()| {});
        assert!(matches!(result, Err(ThrMgrError::InvalidConfig)));
    }

    #[test]
    fn destroy_without_dispatch_is_clean() {
        let pool = ThreadPool::new(PoolConfig::new(4, Duration::from_secs(1)), |_: ()| {}).unwrap();
        assert_eq!(pool.thr_alive(), 0);
        pool.destroy();
        assert_eq!(pool.thr_alive(), 0);
    }

    #[test]
    fn double_destroy_is_idempotent() {
        let pool = ThreadPool::new(PoolConfig::new(2, Duration::from_secs(1)), |_: ()| {}).unwrap();
        pool.destroy();
        pool.destroy();
    }

    #[test]
    fn basic_dispatch_runs_every_item() {
        let results = Arc::new(StdMutex::new(Vec::new()));
        let r = Arc::clone(&results);
        let pool = ThreadPool::new(PoolConfig::new(4, Duration::from_secs(30)), move |id: usize| {
            r.lock().unwrap().push(id);
        })
        .unwrap();
        for i in 0..3 {
            assert!(pool.dispatch(i));
        }
        pool.destroy();
        let mut got = results.lock().unwrap().clone();
        got.sort();
        assert_eq!(got, vec![0, 1, 2]);
    }

    #[test]
    fn dispatch_after_destroy_fails() {
        let pool = ThreadPool::new(PoolConfig::new(2, Duration::from_secs(1)), |_: ()| {}).unwrap();
        pool.destroy();
        assert!(!pool.dispatch(()));
    }

    #[test]
    fn thr_alive_never_exceeds_max() {
        let max_seen = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::new(PoolConfig::new(2, Duration::from_secs(30)), {
            move |_: ()| {
                std::thread::sleep(Duration::from_millis(20));
            }
        })
        .unwrap();
        for _ in 0..20 {
            pool.dispatch(());
            max_seen.fetch_max(pool.thr_alive(), Ordering::Relaxed);
        }
        pool.destroy();
        assert!(max_seen.load(Ordering::Relaxed) <= 2);
    }

    #[test]
    fn single_worker_runs_sequentially_in_order() {
        let order = Arc::new(StdMutex::new(Vec::new()));
        let o = Arc::clone(&order);
        let pool = ThreadPool::new(PoolConfig::new(1, Duration::from_secs(30)), move |id: usize| {
            o.lock().unwrap().push(id);
            std::thread::sleep(Duration::from_millis(10));
        })
        .unwrap();
        pool.dispatch(0);
        pool.dispatch(1);
        pool.destroy();
        assert_eq!(*order.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn idle_worker_is_reaped_after_timeout() {
        let pool = ThreadPool::new(PoolConfig::new(4, Duration::from_millis(200)), |_: ()| {}).unwrap();
        for _ in 0..4 {
            pool.dispatch(());
        }
        std::thread::sleep(Duration::from_millis(600));
        assert_eq!(pool.thr_alive(), 0);
        assert!(pool.dispatch(()));
        std::thread::sleep(Duration::from_millis(50));
        pool.destroy();
    }
}
