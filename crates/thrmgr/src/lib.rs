//! thrmgr — bounded worker-pool subsystem.
//!
//! A pool spawns long-lived worker threads on demand up to a configured
//! ceiling, reaps them after an idle timeout, and executes opaque work
//! items handed in by many producers via [`ThreadPool::dispatch`]. Two
//! cross-cutting pieces ride along: [`group`] lets a producer submit a
//! batch and block for all of it to finish with success/error tallies, and
//! [`registry`]/[`task`] together give a live introspection path that can
//! walk every pool's queue and running tasks concurrently with the workers
//! themselves, via [`printstats`].
//!
//! Out of scope (by design, not omission): work stealing between pools,
//! priority scheduling, cancellation of in-flight work, queue persistence,
//! and producer back-pressure beyond a `dispatch` that returns `false`.

pub mod error;
pub mod group;
pub mod platform;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod task;

pub use error::{ThrMgrError, ThrMgrResult};
pub use group::{JobGroup, JobOutcome};
pub use platform::PlatformMemInfo;
pub use pool::{PoolConfig, PoolState, ThreadPool};
pub use registry::{printstats, PoolIntrospect, StatsSink, WriteSink};
pub use task::{set_active_engine, set_active_task, EngineMemInfo, IDLE};
