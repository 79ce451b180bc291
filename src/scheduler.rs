//! Periodic task engine.
//!
//! Every control activity (sensor readers, logger, pump controller, flow
//! monitor, plant model) is a [`PeriodicTask`]: a body invoked on its own
//! thread at a fixed period.
//!
//! ```text
//!   release_0        release_1        release_2        release_3
//!      │                │                │                │
//!      ▼                ▼                ▼                ▼
//!      ├──body──┤ sleep ├──body──┤ sleep ├─────body──────────┤ (miss)
//!                                                            └─ resync: release_3' = now
//! ```
//!
//! Releases are computed from the previous *intended* release, never from
//! the previous finish, so per-cycle jitter does not accumulate.  A body
//! that overruns its period is a deadline miss: it is reported and the
//! anchor is moved to "now" instead of firing a backlog of catch-up cycles.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::diagnostics::{TaskStats, panic_message};
use crate::drivers::spawn::{Priority, TASK_STACK_KB, spawn_with_priority};
use crate::error::TaskError;

// ═══════════════════════════════════════════════════════════════
//  Release arithmetic
// ═══════════════════════════════════════════════════════════════

/// What the task thread should do after a body completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Sleep this long, then run the next cycle.
    Sleep(Duration),
    /// The next release was already in the past; run immediately.
    Missed { late_by: Duration },
}

/// Drift-free release bookkeeping for one periodic task.
///
/// Pure arithmetic over [`Instant`]s so it can be exercised without
/// threads or real time.
#[derive(Debug, Clone)]
pub struct ReleaseSchedule {
    period: Duration,
    next: Instant,
    misses: u64,
}

impl ReleaseSchedule {
    /// First release happens at `anchor`.
    pub fn new(period: Duration, anchor: Instant) -> Self {
        Self {
            period,
            next: anchor,
            misses: 0,
        }
    }

    /// The release instant of the cycle currently executing.
    pub fn current_release(&self) -> Instant {
        self.next
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Advance to the next release after a body finished at `now`.
    pub fn advance(&mut self, now: Instant) -> Wake {
        self.next += self.period;
        if self.next > now {
            Wake::Sleep(self.next - now)
        } else {
            self.misses += 1;
            let late_by = now - self.next;
            self.next = now;
            Wake::Missed { late_by }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Periodic task
// ═══════════════════════════════════════════════════════════════

type Body = Box<dyn FnMut() + Send + 'static>;

/// State shared between the owning [`PeriodicTask`] and its thread.
struct TaskShared {
    running: AtomicBool,
    /// Stop request; guarded so the sleeper can wait on `wake`.
    stop_requested: Mutex<bool>,
    wake: Condvar,
    max_exec_ns: AtomicU64,
    cycles: AtomicU64,
    deadline_misses: AtomicU64,
    failed: AtomicBool,
}

impl TaskShared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            stop_requested: Mutex::new(false),
            wake: Condvar::new(),
            max_exec_ns: AtomicU64::new(0),
            cycles: AtomicU64::new(0),
            deadline_misses: AtomicU64::new(0),
            failed: AtomicBool::new(false),
        }
    }

    /// Sleep for `duration` unless a stop is requested first.
    /// Returns `true` if the task should keep running.
    fn sleep(&self, duration: Duration) -> bool {
        let guard = self
            .stop_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, duration, |stop| !*stop)
            .unwrap_or_else(PoisonError::into_inner);
        !*guard
    }

    fn is_stop_requested(&self) -> bool {
        *self
            .stop_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
        let mut stop = self
            .stop_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *stop = true;
        self.wake.notify_all();
    }

    fn record_exec(&self, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.max_exec_ns.fetch_max(ns, Ordering::Relaxed);
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }
}

/// A body executed on a dedicated thread every `period`.
///
/// Lifecycle: `new` → `start` (once) → `stop` (idempotent).  A stopped
/// task is never restarted.
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    priority: Priority,
    body: Option<Body>,
    shared: Arc<TaskShared>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn new(
        name: &'static str,
        period: Duration,
        priority: Priority,
        body: impl FnMut() + Send + 'static,
    ) -> Self {
        Self {
            name,
            period,
            priority,
            body: Some(Box::new(body)),
            shared: Arc::new(TaskShared::new()),
            handle: None,
        }
    }

    /// Spawn the task thread.  The first release is immediate.
    pub fn start(&mut self) -> Result<(), TaskError> {
        if self.shared.is_stop_requested() {
            return Err(TaskError::Stopped(self.name));
        }
        let mut body = self.body.take().ok_or(TaskError::AlreadyStarted(self.name))?;
        let shared = Arc::clone(&self.shared);
        let name = self.name;
        let period = self.period;

        shared.running.store(true, Ordering::Release);
        let spawned = spawn_with_priority(name, self.priority, TASK_STACK_KB, move || {
            run_loop(name, period, &mut body, &shared);
        });

        match spawned {
            Ok(handle) => {
                info!("Task '{}' started (period={:?}, {})", name, period, self.priority);
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                error!("Task '{}' spawn failed: {}", name, e);
                Err(TaskError::SpawnFailed(name))
            }
        }
    }

    /// Request the task to stop and wait for the in-flight body to finish.
    ///
    /// Safe to call any number of times, and before `start`, after which
    /// the task can no longer be started.
    pub fn stop(&mut self) {
        self.shared.request_stop();
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.thread().id() == std::thread::current().id() {
            // Stopping from inside the body: the loop exits after this cycle.
            return;
        }
        if handle.join().is_err() {
            error!("Task '{}' thread terminated abnormally", self.name);
        }
        info!("Task '{}' stopped", self.name);
    }

    /// True while the task thread is executing cycles.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// True if the body panicked and the task terminated.
    pub fn has_failed(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    /// Worst observed body execution time.
    pub fn max_exec_time(&self) -> Duration {
        Duration::from_nanos(self.shared.max_exec_ns.load(Ordering::Relaxed))
    }

    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Relaxed)
    }

    pub fn deadline_misses(&self) -> u64 {
        self.shared.deadline_misses.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats {
            name: self.name,
            priority: self.priority,
            period: self.period,
            cycles: self.cycles(),
            deadline_misses: self.deadline_misses(),
            max_exec: self.max_exec_time(),
            failed: self.has_failed(),
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(name: &'static str, period: Duration, body: &mut Body, shared: &TaskShared) {
    let mut schedule = ReleaseSchedule::new(period, Instant::now());

    while shared.running.load(Ordering::Acquire) {
        let started = Instant::now();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| body())) {
            error!(
                "TASK FAILURE: '{}' body panicked ({}); task terminated",
                name,
                panic_message(payload.as_ref())
            );
            shared.failed.store(true, Ordering::Release);
            shared.running.store(false, Ordering::Release);
            return;
        }
        let finished = Instant::now();
        shared.record_exec(finished - started);

        match schedule.advance(finished) {
            Wake::Sleep(duration) => {
                if !shared.sleep(duration) {
                    break;
                }
            }
            Wake::Missed { late_by } => {
                shared.deadline_misses.fetch_add(1, Ordering::Relaxed);
                warn!("Deadline miss: '{}' late by {:?}, resynchronising", name, late_by);
            }
        }
    }
    shared.running.store(false, Ordering::Release);
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
