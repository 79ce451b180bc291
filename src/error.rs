//! Unified error types for the MineWatch control kernel.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! startup path's error handling uniform.  All variants are `Copy` so they
//! can be passed across task threads without allocation.
//!
//! Runtime faults (sensor faults, threshold violations, pump
//! inconsistencies) are *not* errors: they are surfaced through the alarm
//! set and never leave the control loop.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor channel was used outside its contract.
    Sensor(SensorError),
    /// A periodic task could not be started.
    Task(TaskError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Task(e) => write!(f, "task: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// `read_value()` called with no completed, unconsumed sample.
    DataNotReady,
    /// Fault-injection command addressed a channel index that does not exist.
    UnknownChannel(u8),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataNotReady => write!(f, "data not ready"),
            Self::UnknownChannel(n) => write!(f, "unknown channel {n}"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Task errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    /// `start()` called on a task that was already started.
    AlreadyStarted(&'static str),
    /// `start()` called on a task that was already stopped.
    Stopped(&'static str),
    /// The OS refused to create the task thread.
    SpawnFailed(&'static str),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyStarted(name) => write!(f, "task '{name}' already started"),
            Self::Stopped(name) => write!(f, "task '{name}' was stopped and cannot start"),
            Self::SpawnFailed(name) => write!(f, "failed to spawn task '{name}'"),
        }
    }
}

impl std::error::Error for TaskError {}

impl From<TaskError> for Error {
    fn from(e: TaskError) -> Self {
        Self::Task(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for [`SystemConfig`].
    ///
    /// [`SystemConfig`]: crate::config::SystemConfig
    Parse { line: usize, column: usize },
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { line, column } => {
                write!(f, "malformed configuration at line {line}, column {column}")
            }
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
