//! Outbound telemetry.
//!
//! The logger task renders a [`Telemetry`] snapshot once per period and
//! hands the line to the [`DashboardSink`](super::ports::DashboardSink).

use core::fmt;

/// A point-in-time snapshot of the published sensor values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Telemetry {
    /// CO concentration (%)
    pub co: f32,
    /// CH4 concentration (%)
    pub ch4: f32,
    /// Air flow (m^3/s)
    pub air_flow: f32,
    /// Pump water flow (cm/s, negative = outflow)
    pub water_flow: f32,
    /// Sump water level (cm)
    pub water_level: f32,
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CO: {:.2}% | CH4: {:.2}% | AirFlow: {:.2} m^3/s | WaterFlow: {:.2} cm/s | \
             waterLevel: {:.2} cm",
            self.co, self.ch4, self.air_flow, self.water_flow, self.water_level
        )
    }
}
