//! Alarm kinds and the shared, idempotent alarm set.
//!
//! Six producer tasks (four readers, pump controller, flow monitor) raise
//! and clear alarms concurrently.  The set is a bitmask behind a single
//! mutex; the dashboard is notified *under the same guard* and only on a
//! membership transition, so:
//!
//! - raising an active alarm or clearing an inactive one is silent;
//! - the sink sees show/clear notifications in exactly the order the set
//!   changed, even when a raise and a clear of the same kind race.
//!
//! The set never logs on its own; presentation belongs to the sink.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::app::ports::DashboardSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AlarmKind {
    // ── Sensor faults ─────────────────────────────────────
    CoSensorFault = 1 << 0,
    Ch4SensorFault = 1 << 1,
    AirFlowSensorFault = 1 << 2,
    WaterFlowSensorFault = 1 << 3,

    // ── Thresholds ────────────────────────────────────────
    CoConcentrationTooHigh = 1 << 4,
    Ch4ConcentrationTooHigh = 1 << 5,
    AirFlowTooLow = 1 << 6,

    // ── Pump malfunction ──────────────────────────────────
    /// Pump commanded on but no outflow measured.
    PumpOnNoFlow = 1 << 7,
    /// Pump commanded off but outflow measured.
    PumpOffFlow = 1 << 8,
}

impl AlarmKind {
    pub const ALL: [AlarmKind; 9] = [
        Self::CoSensorFault,
        Self::Ch4SensorFault,
        Self::AirFlowSensorFault,
        Self::WaterFlowSensorFault,
        Self::CoConcentrationTooHigh,
        Self::Ch4ConcentrationTooHigh,
        Self::AirFlowTooLow,
        Self::PumpOnNoFlow,
        Self::PumpOffFlow,
    ];

    /// Return the bitmask for this alarm.
    pub const fn mask(self) -> u16 {
        self as u16
    }

    /// Operator-facing identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CoSensorFault => "CO_SENSOR_FAULT",
            Self::Ch4SensorFault => "CH4_SENSOR_FAULT",
            Self::AirFlowSensorFault => "AIR_FLOW_SENSOR_FAULT",
            Self::WaterFlowSensorFault => "WATER_FLOW_SENSOR_FAULT",
            Self::CoConcentrationTooHigh => "CO_CONCENTRATION_TOO_HIGH",
            Self::Ch4ConcentrationTooHigh => "CH4_CONCENTRATION_TOO_HIGH",
            Self::AirFlowTooLow => "AIR_FLOW_TOO_LOW",
            Self::PumpOnNoFlow => "PUMP_ON_NO_FLOW",
            Self::PumpOffFlow => "PUMP_OFF_FLOW",
        }
    }
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active alarms, listed in [`AlarmKind::ALL`] order.
pub type ActiveAlarms = heapless::Vec<AlarmKind, 9>;

/// Thread-safe set of active alarms.
pub struct AlarmSet {
    active: Mutex<u16>,
    sink: Arc<dyn DashboardSink>,
}

impl AlarmSet {
    pub fn new(sink: Arc<dyn DashboardSink>) -> Self {
        Self {
            active: Mutex::new(0),
            sink,
        }
    }

    /// Activate `kind`.  Returns `true` if it was not already active.
    pub fn raise(&self, kind: AlarmKind) -> bool {
        let mut active = self.lock();
        if *active & kind.mask() != 0 {
            return false;
        }
        *active |= kind.mask();
        self.sink.log(&format!("\u{26a0} ALARM RAISED: {kind}"));
        self.sink.show_alarm(kind);
        true
    }

    /// Deactivate `kind`.  Returns `true` if it was active.
    pub fn clear(&self, kind: AlarmKind) -> bool {
        let mut active = self.lock();
        if *active & kind.mask() == 0 {
            return false;
        }
        *active &= !kind.mask();
        self.sink.log(&format!("\u{2705} ALARM CLEARED: {kind}"));
        self.sink.clear_alarm(kind);
        true
    }

    pub fn is_active(&self, kind: AlarmKind) -> bool {
        *self.lock() & kind.mask() != 0
    }

    /// Raw bitmask of active alarms.
    pub fn bits(&self) -> u16 {
        *self.lock()
    }

    pub fn is_empty(&self) -> bool {
        self.bits() == 0
    }

    pub fn active(&self) -> ActiveAlarms {
        let bits = self.bits();
        AlarmKind::ALL
            .iter()
            .copied()
            .filter(|k| bits & k.mask() != 0)
            .collect()
    }

    // The mask is a plain integer, valid even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, u16> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
