//! Unix signal handling for SIGURG preemption


use gvthread_core::error::SchedResult;
use std::sync::atomic::{AtomicBool, Ordering};

static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the SIGURG handler for forced preemption
pub fn install_sigurg_handler() -> SchedResult<()> {
    if HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(()); // Already installed
    }
    
    // TODO: Implement actual signal handler
    // For now, just a stub
    
    Ok(())
}

/// Send SIGURG to a worker thread
pub fn send_sigurg(thread_id: u64) -> SchedResult<()> {
    // TODO: Implement using pthread_kill
    // unsafe {
    //     libc::pthread_kill(thread_id as libc::pthread_t, libc::SIGURG);
    // }
    Ok(())
}

/// Block all signals except SIGURG on the current thread
pub fn block_signals_except_sigurg() -> SchedResult<()> {
    // TODO: Implement signal masking
    Ok(())
}
