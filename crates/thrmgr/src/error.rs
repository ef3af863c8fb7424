//! thrmgr error types.

use std::fmt;

/// Errors surfaced by the bounded worker-pool core.
///
/// Every other operation (`dispatch`, `group_dispatch`) returns a plain
/// `bool`; `ThrMgrError` only appears at pool construction, the one
/// boundary that is naturally fallible in Rust. A worker spawn failure is
/// logged and absorbed rather than propagated (an existing worker picks up
/// the queued item instead), and a poisoned mutex is treated as a fatal
/// condition handled at its call site rather than surfaced as a value.
#[derive(Debug)]
pub enum ThrMgrError {
    /// `max_threads == 0` at construction.
    InvalidConfig,
}

impl fmt::Display for ThrMgrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig => write!(f, "invalid pool configuration: max_threads must be >= 1"),
        }
    }
}

impl std::error::Error for ThrMgrError {}

pub type ThrMgrResult<T> = Result<T, ThrMgrError>;
