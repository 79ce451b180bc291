//! Runtime diagnostics: per-task timing statistics and panic reporting.
//!
//! Every [`PeriodicTask`](crate::scheduler::PeriodicTask) exposes a
//! [`TaskStats`] snapshot.  At shutdown the simulation collects them into a
//! [`TaskReport`] and logs the worst-case execution time of each task,
//! which is the figure the schedulability analysis of the real controller
//! is based on.

use core::fmt;
use std::any::Any;
use std::time::Duration;

use crate::drivers::spawn::Priority;

/// Upper bound on the number of tasks in one report.
pub const MAX_REPORTED_TASKS: usize = 12;

/// Point-in-time statistics of one periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub name: &'static str,
    pub priority: Priority,
    pub period: Duration,
    /// Completed body invocations.
    pub cycles: u64,
    pub deadline_misses: u64,
    /// Worst observed body execution time.
    pub max_exec: Duration,
    /// The body panicked and the task was terminated.
    pub failed: bool,
}

impl TaskStats {
    /// Worst-case execution time as a fraction of the period.
    pub fn utilisation(&self) -> f64 {
        if self.period.is_zero() {
            return 0.0;
        }
        self.max_exec.as_secs_f64() / self.period.as_secs_f64()
    }
}

impl fmt::Display for TaskStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<18} {} period={:>5}ms cycles={:>6} misses={:>3} max_exec_time={:.3}ms util={:.1}%{}",
            self.name,
            self.priority,
            self.period.as_millis(),
            self.cycles,
            self.deadline_misses,
            self.max_exec.as_secs_f64() * 1000.0,
            self.utilisation() * 100.0,
            if self.failed { " FAILED" } else { "" },
        )
    }
}

/// Fixed-capacity collection of task statistics.
#[derive(Debug, Clone, Default)]
pub struct TaskReport {
    entries: heapless::Vec<TaskStats, MAX_REPORTED_TASKS>,
}

impl TaskReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.  Entries beyond capacity are dropped with a warning.
    pub fn push(&mut self, stats: TaskStats) {
        if self.entries.push(stats).is_err() {
            log::warn!("TaskReport full, dropping stats for '{}'", stats.name);
        }
    }

    pub fn append(&mut self, other: &TaskReport) {
        for stats in other.iter() {
            self.push(*stats);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskStats> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tasks whose body panicked.
    pub fn failed(&self) -> impl Iterator<Item = &TaskStats> {
        self.entries.iter().filter(|s| s.failed)
    }

    /// Write one line per task through the logger.
    pub fn log(&self) {
        for stats in &self.entries {
            if stats.failed {
                log::error!("{}", stats);
            } else {
                log::info!("{}", stats);
            }
        }
    }
}

/// Extract a printable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

/// Install a panic hook that routes panic messages through the logger.
///
/// Call once during startup, after the logger is initialised.  Task bodies
/// that panic are additionally caught and reported by the scheduler.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let thread = std::thread::current();
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        log::error!(
            "PANIC in '{}' at {}: {}",
            thread.name().unwrap_or("<unnamed>"),
            location,
            panic_message(info.payload())
        );
    }));
}
