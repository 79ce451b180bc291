//! MineWatch main entry point
//!
//! Runs the control kernel against the simulated plant, with a log-based
//! dashboard and a line-oriented operator console on stdin.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimulatedPlant    LogDashboard    MonotonicClock   stdin      │
//! │  (Plant)           (DashboardSink) (TimeSource)     console    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ControlSystem · PumpActuationSubsystem · SensorHub    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  PeriodicTask scheduler (one thread per task)                  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `minewatch [config.json]`.  `RUST_LOG` overrides the default
//! `info` filter.
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{error, info, warn};

use minewatch::adapters::log_sink::LogDashboard;
use minewatch::app::commands::OperatorCommand;
use minewatch::app::service::{CommandOutcome, Simulation};
use minewatch::config::SystemConfig;
use minewatch::diagnostics;

// ── Helpers ───────────────────────────────────────────────────

fn load_config() -> Result<SystemConfig> {
    let Some(path) = std::env::args().nth(1) else {
        info!("No config file given, using defaults");
        return Ok(SystemConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config file '{path}'"))?;
    let config = SystemConfig::from_json(&text)
        .with_context(|| format!("parsing config file '{path}'"))?;
    info!("Config loaded from {}", path);
    Ok(config)
}

/// Forward stdin lines to the main loop.  The thread ends with stdin.
fn spawn_console(tx: mpsc::Sender<String>) -> Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("spawning operator console")?;
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    diagnostics::install_panic_handler();

    info!("╔══════════════════════════════════════╗");
    info!("║  MineWatch v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config()?;
    let run_for = (config.run_duration_secs > 0)
        .then(|| Duration::from_secs(config.run_duration_secs));

    // ── 3. Wiring ─────────────────────────────────────────────
    let mut sim = Simulation::new(config, Arc::new(LogDashboard::new()))
        .context("building simulation")?;
    sim.start().context("starting periodic tasks")?;

    let (tx, rx) = mpsc::channel::<String>();
    spawn_console(tx)?;
    info!("Commands: fault <1-4> | fix <1-4> | pump on|off|faulty|ok | status | quit");

    // ── 4. Event loop ─────────────────────────────────────────
    let started = Instant::now();
    loop {
        if run_for.is_some_and(|d| started.elapsed() >= d) {
            info!("Run duration elapsed");
            break;
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => match line.parse::<OperatorCommand>() {
                Ok(cmd) => {
                    if sim.handle_command(cmd) == CommandOutcome::Quit {
                        info!("Operator quit");
                        break;
                    }
                }
                Err(e) => warn!("Console: {e}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            // stdin closed: keep running until the duration elapses.
            Err(RecvTimeoutError::Disconnected) => {
                if run_for.is_none() {
                    info!("Console closed");
                    break;
                }
                std::thread::sleep(Duration::from_millis(100));
            }
        }
    }

    // ── 5. Shutdown + WCET report ─────────────────────────────
    let report = sim.stop();
    report.log();
    for failed in report.failed() {
        error!("Task '{}' terminated abnormally during the run", failed.name);
    }
    Ok(())
}
