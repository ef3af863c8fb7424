//! Platform-specific policy hooks: worker stack size and the optional
//! heap/mmap memory summary line trailing `printstats`'s output.

/// BSD and HP-UX need a bigger stack than the system default; everywhere
/// else `None` tells the pool to use `std::thread::Builder`'s default.
pub fn worker_stack_size() -> Option<usize> {
    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly",
        target_os = "hpux"
    ))]
    {
        Some(1_048_576 + 64 * 1024)
    }
    #[cfg(not(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly",
        target_os = "hpux"
    )))]
    {
        None
    }
}

/// Portable analogue of glibc's `mallinfo()`. All fields in bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformMemInfo {
    pub heap: u64,
    pub mmap: u64,
    pub used: u64,
    pub free: u64,
    pub releasable: u64,
}

/// Reads `/proc/self/statm`. `mallinfo()` is deprecated upstream and cannot
/// be called soundly from safe Rust without binding glibc directly, so this
/// reports resident/virtual size instead of allocator arena statistics —
/// the closest portable, allocator-independent equivalent.
#[cfg(target_os = "linux")]
pub fn platform_mem_info() -> Option<PlatformMemInfo> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let mut fields = statm.split_whitespace();
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as u64;
    let size_pages: u64 = fields.next()?.parse().ok()?;
    let resident_pages: u64 = fields.next()?.parse().ok()?;
    let shared_pages: u64 = fields.next()?.parse().ok()?;
    let resident = resident_pages.saturating_mul(page_size);
    let shared = shared_pages.saturating_mul(page_size);
    Some(PlatformMemInfo {
        heap: resident.saturating_sub(shared),
        mmap: shared,
        used: resident,
        free: size_pages.saturating_mul(page_size).saturating_sub(resident),
        releasable: 0,
    })
}

/// No portable equivalent is wired up for this platform — the `MEMSTATS:`
/// line is omitted entirely rather than printed with zeroed fields.
#[cfg(not(target_os = "linux"))]
pub fn platform_mem_info() -> Option<PlatformMemInfo> {
    None
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn reads_self_statm_without_error() {
        let info = platform_mem_info();
        assert!(info.is_some());
        assert!(info.unwrap().used > 0);
    }
}
