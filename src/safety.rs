//! Pump flow-consistency supervisor.
//!
//! Cross-checks the commanded pump state against the measured water flow
//! (outflow is negative) once per monitor cycle.
//!
//! ## Anomaly lifecycle
//!
//! 1. Pump commanded on but measured flow ≥ 0, or commanded off but
//!    measured flow < 0: the cycle is anomalous and the counter grows.
//! 2. Once the counter reaches the persistence threshold the verdict
//!    becomes [`FlowVerdict::Persistent`] and the caller raises the alarm.
//! 3. A single consistent cycle resets the counter; the caller then clears
//!    both pump alarms.
//!
//! The counter is shared by both anomaly kinds: a pump that flips between
//! "on without flow" and "off with flow" keeps accumulating.  This type is
//! pure state so the persistence rule can be tested without threads.

use crate::control::alarms::AlarmKind;

/// Outcome of one flow-consistency evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowVerdict {
    /// Commanded state and measured flow agree.
    Consistent,
    /// Inconsistent, but not yet for long enough to alarm.
    Suspect(AlarmKind),
    /// Inconsistent for at least the persistence threshold.
    Persistent(AlarmKind),
}

#[derive(Debug, Clone)]
pub struct FlowConsistencyMonitor {
    persistence: u32,
    anomaly_count: u32,
}

impl FlowConsistencyMonitor {
    pub fn new(persistence: u32) -> Self {
        Self {
            persistence: persistence.max(1),
            anomaly_count: 0,
        }
    }

    /// Evaluate one cycle.
    pub fn evaluate(&mut self, commanded_on: bool, measured_flow: f32) -> FlowVerdict {
        let anomaly = match (commanded_on, measured_flow < 0.0) {
            (true, false) => Some(AlarmKind::PumpOnNoFlow),
            (false, true) => Some(AlarmKind::PumpOffFlow),
            _ => None,
        };

        let Some(kind) = anomaly else {
            self.anomaly_count = 0;
            return FlowVerdict::Consistent;
        };

        self.anomaly_count = self.anomaly_count.saturating_add(1);
        if self.anomaly_count >= self.persistence {
            FlowVerdict::Persistent(kind)
        } else {
            FlowVerdict::Suspect(kind)
        }
    }

    /// Consecutive anomalous cycles so far.
    pub fn anomaly_count(&self) -> u32 {
        self.anomaly_count
    }

    pub fn persistence(&self) -> u32 {
        self.persistence
    }
}
