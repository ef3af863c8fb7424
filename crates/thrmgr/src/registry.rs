//! Pool registry & statistics dump.
//!
//! A process-wide list of live pools behind one lock. Pools self-register
//! on construction and unregister on `destroy`/drop. `printstats` walks the
//! registry, then each pool in turn, emitting the human-readable block an
//! operator command would display.
//!
//! The lock order honored throughout this crate is registry → pool → group;
//! `printstats` takes the registry lock only long enough to snapshot
//! the live pool list, then releases it before taking any individual pool's
//! lock, so it never holds both at once.

use std::io;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::platform;
use crate::task::EngineMemInfo;

/// A single "write one formatted line" sink. `printstats` never assumes
/// more of its byte sink than this.
pub trait StatsSink {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Adapts any `std::io::Write` into a `StatsSink`.
pub struct WriteSink<W>(pub W);

impl<W: io::Write> StatsSink for WriteSink<W> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.0, "{line}")
    }
}

/// Object-safe introspection surface a `ThreadPool<T>` implements for every
/// `T`, letting the registry hold heterogeneous pools behind `dyn`.
pub trait PoolIntrospect: Send + Sync {
    fn id(&self) -> u64;

    /// Emits this pool's `STATE`/`THREADS`/`QUEUE`/task-list block.
    /// `seen` accumulates distinct engine handles across the *entire* dump
    /// (not reset per pool) — deliberately mirroring the original's
    /// function-scoped `seen` array, so an engine shared by two pools is
    /// only billed once in the trailing `MEMSTATS` totals.
    fn dump(
        &self,
        sink: &mut dyn StatsSink,
        is_primary: bool,
        seen: &mut Vec<Arc<dyn EngineMemInfo>>,
    ) -> io::Result<(u64, u64, u32)>;
}

struct Entry {
    id: u64,
    pool: Weak<dyn PoolIntrospect>,
}

fn registry() -> &'static Mutex<Vec<Entry>> {
    static REGISTRY: OnceLock<Mutex<Vec<Entry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

fn lock_registry() -> std::sync::MutexGuard<'static, Vec<Entry>> {
    registry().lock().unwrap_or_else(|poisoned| {
        tracing::error!("pool registry mutex poisoned; recovering last known list");
        poisoned.into_inner()
    })
}

pub(crate) fn register(pool: Arc<dyn PoolIntrospect>) {
    let mut guard = lock_registry();
    guard.insert(0, Entry { id: pool.id(), pool: Arc::downgrade(&pool) });
}

/// Unlinks the pool with the given id. A no-op if it is already gone.
///
/// The lock is always released via RAII regardless of which branch is
/// taken — there is no early-return path that can leave it held.
pub(crate) fn unregister(id: u64) {
    let mut guard = lock_registry();
    guard.retain(|entry| entry.id != id);
}

/// Writes the full statistics block to `sink`: `POOLS: <n>`, one block per
/// live pool, an optional platform `MEMSTATS:` line, and a trailing `END`.
pub fn printstats(sink: &mut dyn StatsSink) -> io::Result<()> {
    let pools: Vec<Arc<dyn PoolIntrospect>> = {
        let guard = lock_registry();
        guard.iter().filter_map(|e| e.pool.upgrade()).collect()
    };

    sink.write_line(&format!("POOLS: {}", pools.len()))?;
    sink.write_line("")?;

    let mut seen: Vec<Arc<dyn EngineMemInfo>> = Vec::new();
    let mut pool_used = 0u64;
    let mut pool_total = 0u64;
    let mut pool_cnt = 0u32;
    let last = pools.len().saturating_sub(1);
    for (idx, pool) in pools.iter().enumerate() {
        let (used, total, cnt) = pool.dump(sink, idx == last, &mut seen)?;
        pool_used += used;
        pool_total += total;
        pool_cnt += cnt;
    }

    if let Some(mem) = platform::platform_mem_info() {
        const MB: f64 = 1024.0 * 1024.0;
        sink.write_line(&format!(
            "MEMSTATS: heap {:.3}M mmap {:.3}M used {:.3}M free {:.3}M releasable {:.3}M pools {} pools_used {:.3}M pools_total {:.3}M",
            mem.heap as f64 / MB,
            mem.mmap as f64 / MB,
            mem.used as f64 / MB,
            mem.free as f64 / MB,
            mem.releasable as f64 / MB,
            pool_cnt,
            pool_used as f64 / MB,
            pool_total as f64 / MB,
        ))?;
    }
    sink.write_line("END")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSink {
        lines: Vec<String>,
    }

    impl StatsSink for FakeSink {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.lines.push(line.to_string());
            Ok(())
        }
    }

    #[test]
    fn printstats_on_empty_registry_reports_zero_pools_and_ends() {
        // This runs alongside other tests that register real pools in the
        // same process-wide registry; assert on structure, not exact count.
        let mut sink = FakeSink { lines: Vec::new() };
        printstats(&mut sink).unwrap();
        assert!(sink.lines[0].starts_with("POOLS: "));
        assert_eq!(sink.lines.last().unwrap(), "END");
    }
}
