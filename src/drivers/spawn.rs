//! Priority-hinted thread spawning for periodic tasks.
//!
//! Every periodic task gets its own OS thread.  The controller this kernel
//! models runs under a fixed-priority RTOS; on a Linux host the priority is
//! mapped onto the thread's nice value so higher-priority tasks win the CPU
//! under contention.  Only non-negative nice values are used, which an
//! unprivileged process may always set.  Elsewhere the hint is logged and
//! ignored.  Correctness never depends on it.

use std::fmt;
use std::io;
use std::thread::JoinHandle;

/// Stack size for task threads.  Periodic bodies are shallow; 256 KB leaves
/// ample headroom for formatting and panic unwinding.
pub const TASK_STACK_KB: usize = 256;

/// Highest priority that maps to a distinct nice value.  Anything above
/// runs at nice 0.
pub const MAX_PRIORITY: u8 = 10;

/// Task priority.  Higher values preferentially get CPU time when the
/// host applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(pub u8);

impl Priority {
    /// Nice value for this priority: `MAX_PRIORITY` → 0, `0` → 10.
    pub fn nice(self) -> i32 {
        i32::from(MAX_PRIORITY - self.0.min(MAX_PRIORITY))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

// ── OS priority ───────────────────────────────────────────────

/// Apply `priority` to the calling thread.
#[cfg(target_os = "linux")]
fn apply_current_thread(priority: Priority) -> io::Result<()> {
    // SAFETY: gettid has no preconditions; setpriority only reads its
    // scalar arguments.  On Linux PRIO_PROCESS with a tid targets one thread.
    let ret = unsafe {
        let tid = libc::gettid() as libc::id_t;
        libc::setpriority(libc::PRIO_PROCESS, tid, priority.nice())
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn apply_current_thread(_priority: Priority) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "per-thread priority not supported on this host",
    ))
}

/// Nice value of the calling thread.
#[cfg(target_os = "linux")]
pub fn current_thread_nice() -> i32 {
    // SAFETY: see `apply_current_thread`.
    unsafe {
        let tid = libc::gettid() as libc::id_t;
        libc::getpriority(libc::PRIO_PROCESS, tid)
    }
}

/// Spawn a named thread running at `priority`.
///
/// The priority is applied from inside the new thread before `f` runs.  If
/// the OS refuses, a warning is logged and the thread runs at the
/// inherited priority.
pub fn spawn_with_priority<T: Send + 'static>(
    name: &'static str,
    priority: Priority,
    stack_kb: usize,
    f: impl FnOnce() -> T + Send + 'static,
) -> io::Result<JoinHandle<T>> {
    log::debug!(
        "Spawning '{}' ({}, nice={}, stack={}KB)",
        name,
        priority,
        priority.nice(),
        stack_kb
    );

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(move || {
            if let Err(e) = apply_current_thread(priority) {
                log::warn!("'{}': priority {} not applied: {}", name, priority, e);
            }
            f()
        })
}
