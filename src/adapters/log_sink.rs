//! Log-based dashboard adapter.
//!
//! Implements [`DashboardSink`] by writing every notification through the
//! `log` facade (stderr via `env_logger` in the binary).  A graphical
//! dashboard would implement the same trait.

use std::sync::atomic::{AtomicU32, Ordering};

use log::{info, warn};

use crate::app::ports::DashboardSink;
use crate::control::alarms::AlarmKind;

/// Adapter that logs every dashboard update.
///
/// The gauge is only re-logged when the level moved by at least
/// [`LogDashboard::GAUGE_RESOLUTION_CM`], to keep the console readable.
#[derive(Debug)]
pub struct LogDashboard {
    last_gauge_bits: AtomicU32,
}

impl LogDashboard {
    pub const GAUGE_RESOLUTION_CM: f32 = 0.5;

    pub fn new() -> Self {
        Self {
            last_gauge_bits: AtomicU32::new(f32::NAN.to_bits()),
        }
    }
}

impl Default for LogDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardSink for LogDashboard {
    fn log(&self, message: &str) {
        info!("DASH | {message}");
    }

    fn show_alarm(&self, kind: AlarmKind) {
        warn!("DASH | alarm lamp ON  {kind}");
    }

    fn clear_alarm(&self, kind: AlarmKind) {
        info!("DASH | alarm lamp OFF {kind}");
    }

    fn set_pump_indicator(&self, on: bool) {
        info!("DASH | pump indicator {}", if on { "ON" } else { "OFF" });
    }

    fn update_water_level_gauge(&self, value: f32, min: f32, max: f32) {
        let last = f32::from_bits(self.last_gauge_bits.load(Ordering::Relaxed));
        if !last.is_nan() && (value - last).abs() < Self::GAUGE_RESOLUTION_CM {
            return;
        }
        self.last_gauge_bits.store(value.to_bits(), Ordering::Relaxed);

        let span = (max - min).max(f32::EPSILON);
        let pct = ((value - min) / span * 100.0).clamp(0.0, 100.0);
        info!("DASH | water level {value:.2} cm [{min:.0}..{max:.0}] {pct:.0}%");
    }
}
