//! Port traits: the boundary between the control kernel and its collaborators.
//!
//! ```text
//!   SimulatedPlant ──▶ Plant ─────────────┐
//!                                         ▼
//!   MonotonicClock ──▶ TimeSource ──▶ control kernel ──▶ DashboardSink ──▶ LogDashboard
//!                                         │
//!                     WaterLevelListener ◀┘ (implemented by the kernel, called by the plant)
//! ```
//!
//! Every port is shared between task threads, so all methods take `&self`
//! and implementations must be `Send + Sync`.

use std::time::Instant;

use crate::control::alarms::AlarmKind;

// ───────────────────────────────────────────────────────────────
// Plant (driven adapter: physical process ↔ kernel)
// ───────────────────────────────────────────────────────────────

/// The physical process under control.
///
/// Readers sample the signal getters through simulated ADC channels; the
/// pump subsystem commands the pump.  Flows are signed: negative pump flow
/// means water is leaving the sump.
pub trait Plant: Send + Sync {
    /// CO concentration (%).
    fn co_concentration(&self) -> f32;
    /// CH4 concentration (%).
    fn ch4_concentration(&self) -> f32;
    /// Ventilation air flow (m^3/s).
    fn air_flow(&self) -> f32;
    /// Flow through the pump (cm/s, negative = outflow).
    fn pump_flow(&self) -> f32;
    /// Sump water level (cm).
    fn water_level(&self) -> f32;
    /// Simulated time since the plant started (ms).
    fn elapsed_time(&self) -> f32;

    fn turn_pump_on(&self);
    fn turn_pump_off(&self);

    /// A faulty pump ignores on/off commands and keeps its last state.
    fn set_pump_faulty(&self, faulty: bool);
}

/// Edge-triggered level notifications the plant delivers to the kernel.
pub trait WaterLevelListener: Send + Sync {
    /// The level rose to or above the high threshold.
    fn on_water_level_high(&self);
    /// The level fell to or below the low threshold.
    fn on_water_level_low(&self);
}

// ───────────────────────────────────────────────────────────────
// Dashboard sink (driven adapter: kernel → operator display)
// ───────────────────────────────────────────────────────────────

/// Passive sink for everything the operator sees.  Never called back into
/// the kernel.
pub trait DashboardSink: Send + Sync {
    /// Append a formatted line to the operator log.
    fn log(&self, message: &str);

    fn show_alarm(&self, kind: AlarmKind);

    fn clear_alarm(&self, kind: AlarmKind);

    fn set_pump_indicator(&self, on: bool);

    fn update_water_level_gauge(&self, value: f32, min: f32, max: f32);
}

// ───────────────────────────────────────────────────────────────
// Time source
// ───────────────────────────────────────────────────────────────

/// Monotonic time used to evaluate ADC conversion latency.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}
