//! PeriodicTask behaviour on real threads.
//!
//! Bounds are deliberately loose: CI machines are noisy, and the exact
//! release arithmetic is covered by the pure `ReleaseSchedule` tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::sleep;
use std::time::{Duration, Instant};

use minewatch::drivers::spawn::Priority;
use minewatch::error::TaskError;
use minewatch::scheduler::PeriodicTask;

fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn task_runs_periodically_until_stopped() {
    let count = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&count);
    let mut task = PeriodicTask::new("counter", Duration::from_millis(10), Priority(3), move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    task.start().unwrap();
    sleep(Duration::from_millis(200));
    task.stop();

    let n = count.load(Ordering::SeqCst);
    assert!(n >= 5, "only {n} cycles in 200ms");
    assert!(n <= 25, "{n} cycles in 200ms at a 10ms period");
    assert!(!task.is_running());
    assert_eq!(u64::from(n), task.cycles());

    sleep(Duration::from_millis(30));
    assert_eq!(count.load(Ordering::SeqCst), n, "body ran after stop");
}

#[test]
fn starting_twice_fails() {
    let mut task = PeriodicTask::new("twice", Duration::from_millis(50), Priority(1), || {});
    task.start().unwrap();
    assert_eq!(task.start(), Err(TaskError::AlreadyStarted("twice")));
    task.stop();
}

#[test]
fn stop_wakes_a_long_sleep_promptly() {
    let mut task = PeriodicTask::new("sleepy", Duration::from_secs(10), Priority(1), || {});
    task.start().unwrap();
    sleep(Duration::from_millis(20));

    let t0 = Instant::now();
    task.stop();
    assert!(t0.elapsed() < Duration::from_secs(1));
    task.stop();
}

#[test]
fn panicking_body_marks_task_failed() {
    let mut task = PeriodicTask::new("doomed", Duration::from_millis(10), Priority(2), || {
        panic!("sensor bus exploded");
    });
    task.start().unwrap();

    assert!(wait_until(Duration::from_secs(2), || task.has_failed()));
    assert!(!task.is_running());

    let stats = task.stats();
    assert!(stats.failed);
    assert_eq!(stats.cycles, 0);
    task.stop();
}

#[test]
fn failure_of_one_task_leaves_others_running() {
    let count = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&count);
    let mut healthy = PeriodicTask::new("healthy", Duration::from_millis(10), Priority(1), move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    let mut doomed = PeriodicTask::new("doomed2", Duration::from_millis(10), Priority(5), || {
        panic!("boom");
    });

    healthy.start().unwrap();
    doomed.start().unwrap();
    assert!(wait_until(Duration::from_secs(2), || doomed.has_failed()));

    let before = count.load(Ordering::SeqCst);
    sleep(Duration::from_millis(60));
    assert!(count.load(Ordering::SeqCst) > before);
    assert!(healthy.is_running());

    healthy.stop();
    doomed.stop();
}

#[test]
fn max_exec_time_tracks_slowest_cycle() {
    let mut task = PeriodicTask::new("busy", Duration::from_millis(20), Priority(2), || {
        sleep(Duration::from_millis(5));
    });
    task.start().unwrap();
    assert!(wait_until(Duration::from_secs(2), || task.cycles() >= 3));
    task.stop();

    assert!(task.max_exec_time() >= Duration::from_millis(5));
}

#[test]
fn overrunning_body_counts_deadline_misses() {
    let mut task = PeriodicTask::new("overrun", Duration::from_millis(5), Priority(2), || {
        sleep(Duration::from_millis(15));
    });
    task.start().unwrap();
    assert!(wait_until(Duration::from_secs(2), || task.deadline_misses() >= 2));
    task.stop();

    assert!(task.stats().deadline_misses >= 2);
}

#[test]
fn task_stopped_before_start_never_runs() {
    let count = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&count);
    let mut task = PeriodicTask::new("never", Duration::from_millis(5), Priority(2), move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    task.stop();
    assert_eq!(task.start(), Err(TaskError::Stopped("never")));
    sleep(Duration::from_millis(50));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[cfg(target_os = "linux")]
#[test]
fn task_threads_run_at_their_priority() {
    use std::sync::mpsc;
    use minewatch::drivers::spawn::current_thread_nice;

    let inherited = current_thread_nice();
    let (tx, rx) = mpsc::channel();
    let mut tasks: Vec<PeriodicTask> = [Priority(1), Priority(8)]
        .into_iter()
        .map(|p| {
            let tx = tx.clone();
            PeriodicTask::new("nice", Duration::from_millis(20), p, move || {
                let _ = tx.send((p, current_thread_nice()));
            })
        })
        .collect();
    for task in &mut tasks {
        task.start().unwrap();
    }

    let mut seen = Vec::new();
    while seen.len() < 2 {
        let (p, nice) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        if !seen.iter().any(|&(q, _)| q == p) {
            seen.push((p, nice));
        }
    }
    for task in &mut tasks {
        task.stop();
    }

    for (p, nice) in seen {
        assert_eq!(nice, p.nice().max(inherited), "{p}");
    }
}
