//! Worker-local task descriptor.
//!
//! Each worker owns exactly one `TaskDescriptor`, published into thread-local
//! storage on its first loop iteration and linked into the pool's task list
//! under the pool lock. The owning worker is the sole writer; the stats dump
//! reads snapshots under the pool lock. `set_active_task`/`set_active_engine`
//! are the free functions a job handler calls to update *its own* worker's
//! descriptor — mirroring `thrmgr_setactivetask`/`thrmgr_setactiveengine`,
//! which read a pthread-specific slot rather than taking any lock.

use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// The distinguished "not currently processing work" command label.
///
/// A `static` (not `const`) so every reference to `IDLE` resolves to the
/// same address — `set_active_task` compares it by `std::ptr::eq`, not by
/// string contents, exactly as the original compares `command == IDLE_TASK`.
pub static IDLE: &str = "IDLE";

/// Queried by the stats dump to attribute memory usage to a running job's
/// signature engine. Implemented by the daemon embedding this pool; thrmgr
/// only ever calls `mem_stats` on first encountering a given handle.
pub trait EngineMemInfo: Send + Sync {
    /// Returns `(used_bytes, total_bytes)`, or `None` if unavailable —
    /// equivalent to `engine_mem_stats` returning -1.
    fn mem_stats(&self) -> Option<(u64, u64)>;
}

struct TaskState {
    filename: Option<String>,
    command: Option<&'static str>,
    engine: Option<Arc<dyn EngineMemInfo>>,
    started_at: Instant,
}

/// A point-in-time copy of a descriptor's fields, used by the stats dump.
pub struct TaskSnapshot {
    pub command: Option<&'static str>,
    pub filename: Option<String>,
    pub engine: Option<Arc<dyn EngineMemInfo>>,
    pub started_at: Instant,
}

/// Per-worker live-status record, doubly-linked into a pool's task list
/// in spirit (a `Vec<Arc<TaskDescriptor>>` under the pool lock, here).
pub struct TaskDescriptor {
    state: Mutex<TaskState>,
}

impl TaskDescriptor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(TaskState {
                filename: None,
                command: None,
                engine: None,
                started_at: Instant::now(),
            }),
        })
    }

    /// A panic while a worker holds its own descriptor lock only taints that
    /// worker's introspection data, not the whole pool — recover the last
    /// good snapshot instead of escalating to the pool-wide "fatal" policy.
    fn lock_state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_active_task(&self, filename: Option<&str>, command: Option<&'static str>) {
        let mut state = self.lock_state();
        state.filename = filename.map(str::to_string);
        if let Some(cmd) = command {
            let already_idle = std::ptr::eq(cmd, IDLE)
                && state.command.is_some_and(|cur| std::ptr::eq(cur, IDLE));
            if already_idle {
                return;
            }
            state.command = Some(cmd);
            state.started_at = Instant::now();
        }
    }

    pub fn set_active_engine(&self, engine: Option<Arc<dyn EngineMemInfo>>) {
        self.lock_state().engine = engine;
    }

    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        let state = self.lock_state();
        TaskSnapshot {
            command: state.command,
            filename: state.filename.clone(),
            engine: state.engine.clone(),
            started_at: state.started_at,
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<TaskDescriptor>>> = const { RefCell::new(None) };
}

/// Publishes `desc` as the calling thread's active descriptor. Called once
/// by a worker on its first loop iteration, under the pool lock.
pub(crate) fn publish(desc: Arc<TaskDescriptor>) {
    CURRENT.with(|cell| *cell.borrow_mut() = Some(desc));
}

/// Clears the calling thread's descriptor slot. Called when a worker exits.
pub(crate) fn clear() {
    CURRENT.with(|cell| *cell.borrow_mut() = None);
}

/// Updates the calling worker's active-task fields. A no-op on any thread
/// that is not a thrmgr worker (no descriptor published).
pub fn set_active_task(filename: Option<&str>, command: Option<&'static str>) {
    CURRENT.with(|cell| {
        if let Some(desc) = cell.borrow().as_ref() {
            desc.set_active_task(filename, command);
        }
    });
}

/// Updates the calling worker's active-engine handle.
pub fn set_active_engine(engine: Option<Arc<dyn EngineMemInfo>>) {
    CURRENT.with(|cell| {
        if let Some(desc) = cell.borrow().as_ref() {
            desc.set_active_engine(engine);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeEngine(u64, u64);
    impl EngineMemInfo for FakeEngine {
        fn mem_stats(&self) -> Option<(u64, u64)> {
            Some((self.0, self.1))
        }
    }

    #[test]
    fn idle_sentinel_preserves_start_time_on_repeat() {
        let desc = TaskDescriptor::new();
        desc.set_active_task(None, Some(IDLE));
        let first = desc.snapshot().started_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        desc.set_active_task(Some("/tmp/x"), Some(IDLE));
        let snap = desc.snapshot();
        assert_eq!(snap.started_at, first);
        assert_eq!(snap.filename.as_deref(), Some("/tmp/x"));
    }

    #[test]
    fn non_idle_command_refreshes_start_time() {
        let desc = TaskDescriptor::new();
        desc.set_active_task(None, Some(IDLE));
        let idle_start = desc.snapshot().started_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        desc.set_active_task(Some("/a"), Some("SCAN"));
        let snap = desc.snapshot();
        assert!(snap.started_at > idle_start);
        assert_eq!(snap.command, Some("SCAN"));
    }

    #[test]
    fn engine_identity_is_distinguishable() {
        let desc = TaskDescriptor::new();
        let e1: Arc<dyn EngineMemInfo> = Arc::new(FakeEngine(1, 2));
        let e2: Arc<dyn EngineMemInfo> = Arc::new(FakeEngine(3, 4));
        desc.set_active_engine(Some(e1.clone()));
        assert!(Arc::ptr_eq(&desc.snapshot().engine.unwrap(), &e1));
        desc.set_active_engine(Some(e2.clone()));
        assert!(Arc::ptr_eq(&desc.snapshot().engine.unwrap(), &e2));
    }

    #[test]
    fn free_functions_are_noop_without_published_descriptor() {
        // No descriptor published on this thread (test threads never call
        // `publish`) — must not panic.
        set_active_task(Some("x"), Some("Y"));
        set_active_engine(None);
    }
}
