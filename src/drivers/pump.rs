//! Drainage pump driver.
//!
//! Holds the *commanded* pump state and forwards it to the plant.  The
//! commanded state is shared (read-only) with the flow monitor, which
//! compares it against the measured outflow.
//!
//! ## Safety contract
//!
//! The CH4 interlock is enforced by the pump controller; this driver is a
//! dumb actuator.  It announces a transition (log line plus dashboard
//! indicator) only when the commanded state actually changes.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::app::ports::{DashboardSink, Plant};

/// Why the commanded state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpReason {
    Operator,
    WaterLevelHigh,
    WaterLevelLow,
    Ch4Interlock,
}

impl fmt::Display for PumpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Operator => "OPERATOR SIGNAL",
            Self::WaterLevelHigh => "WATER LEVEL HIGH",
            Self::WaterLevelLow => "WATER LEVEL LOW",
            Self::Ch4Interlock => "CH4 CONCENTRATION TOO HIGH",
        })
    }
}

pub struct PumpDriver {
    plant: Arc<dyn Plant>,
    sink: Arc<dyn DashboardSink>,
    commanded: Arc<AtomicBool>,
}

impl PumpDriver {
    pub fn new(plant: Arc<dyn Plant>, sink: Arc<dyn DashboardSink>) -> Self {
        Self {
            plant,
            sink,
            commanded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Command the pump on.
    pub fn turn_on(&self, reason: PumpReason) {
        self.command(true, reason);
    }

    /// Command the pump off.
    pub fn turn_off(&self, reason: PumpReason) {
        self.command(false, reason);
    }

    /// Push the commanded state to the plant.
    pub fn propagate(&self) {
        if self.is_on() {
            self.plant.turn_pump_on();
        } else {
            self.plant.turn_pump_off();
        }
    }

    pub fn is_on(&self) -> bool {
        self.commanded.load(Ordering::Acquire)
    }

    /// Shared read handle on the commanded state.
    pub fn commanded(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.commanded)
    }

    fn command(&self, on: bool, reason: PumpReason) {
        let line = format!("PUMP {} - {reason}", if on { "ON" } else { "OFF" });
        info!("{line}");
        self.sink.log(&line);
        if self.commanded.swap(on, Ordering::AcqRel) != on {
            self.sink.set_pump_indicator(on);
        }
    }
}
