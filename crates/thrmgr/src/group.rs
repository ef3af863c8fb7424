//! Job group barrier.
//!
//! A producer dispatches a batch of items through `ThreadPool::group_dispatch`
//! and later calls `wait_for_all` to block until every one of them has called
//! back through `finished`, collecting success/error tallies.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Ok,
    Error,
}

#[derive(Default)]
pub(crate) struct Tallies {
    pub(crate) jobs: u64,
    exit_ok: u64,
    exit_error: u64,
    exit_total: u64,
}

/// Reference-counted completion barrier. The group outlives every job
/// dispatched through it; callers must not drop their `Arc<JobGroup>` until
/// `wait_for_all` has returned.
pub struct JobGroup {
    pub(crate) inner: Mutex<Tallies>,
    empty: Condvar,
}

impl JobGroup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { inner: Mutex::new(Tallies::default()), empty: Condvar::new() })
    }

    pub(crate) fn lock_tallies(&self) -> MutexGuard<'_, Tallies> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::error!("job group mutex poisoned; a dispatcher panicked while holding it");
            poisoned.into_inner()
        })
    }

    /// Records the outcome of one completed job, decrementing the
    /// outstanding count and waking `wait_for_all` when it reaches zero.
    /// Tolerant of being called more times than jobs were dispatched,
    /// though normal use never does that.
    pub fn finished(&self, outcome: JobOutcome) {
        let mut tallies = self.lock_tallies();
        tallies.exit_total += 1;
        match outcome {
            JobOutcome::Ok => tallies.exit_ok += 1,
            JobOutcome::Error => tallies.exit_error += 1,
        }
        if tallies.jobs > 0 {
            tallies.jobs -= 1;
            if tallies.jobs == 0 {
                self.empty.notify_one();
            }
        }
    }

    /// Blocks until every dispatched job in this group has called
    /// `finished`, then returns `(ok, error, total)`.
    pub fn wait_for_all(&self) -> (u64, u64, u64) {
        let mut tallies = self.lock_tallies();
        while tallies.jobs != 0 {
            tallies = self.empty.wait(tallies).unwrap_or_else(|poisoned| {
                tracing::error!("job group mutex poisoned while waiting; recovering last state");
                poisoned.into_inner()
            });
        }
        (tallies.exit_ok, tallies.exit_error, tallies.exit_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn tallies_match_outcomes() {
        let group = JobGroup::new();
        {
            let mut t = group.lock_tallies();
            t.jobs = 10;
        }
        for _ in 0..7 {
            group.finished(JobOutcome::Ok);
        }
        for _ in 0..3 {
            group.finished(JobOutcome::Error);
        }
        let (ok, err, total) = group.wait_for_all();
        assert_eq!((ok, err, total), (7, 3, 10));
    }

    #[test]
    fn wait_for_all_blocks_until_drained() {
        let group = JobGroup::new();
        {
            let mut t = group.lock_tallies();
            t.jobs = 1;
        }
        let g2 = Arc::clone(&group);
        let handle = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(30));
            g2.finished(JobOutcome::Ok);
        });
        let (ok, err, total) = group.wait_for_all();
        handle.join().unwrap();
        assert_eq!((ok, err, total), (1, 0, 1));
    }
}
