//! System configuration parameters
//!
//! All tunable parameters for the MineWatch control kernel and its
//! simulated plant.  Defaults reproduce the reference deployment; a JSON
//! document can override any subset of fields.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Task periods ---
    /// Period of each of the four sensor reader tasks (milliseconds)
    pub reader_period_ms: u64,
    /// Period of the telemetry logger task (milliseconds)
    pub logger_period_ms: u64,
    /// Period of the pump decision task (milliseconds)
    pub pump_control_period_ms: u64,
    /// Period of the pump flow-consistency monitor (milliseconds)
    pub flow_monitor_period_ms: u64,
    /// Period of the plant model update task (milliseconds)
    pub plant_update_period_ms: u64,
    /// Period of the water-level gauge refresh (milliseconds)
    pub gauge_period_ms: u64,

    // --- Task priorities (higher = more urgent, mapped to nice values) ---
    pub co_reader_priority: u8,
    pub ch4_reader_priority: u8,
    pub air_flow_reader_priority: u8,
    pub water_flow_reader_priority: u8,
    pub logger_priority: u8,
    pub pump_control_priority: u8,
    pub flow_monitor_priority: u8,
    pub plant_priority: u8,
    pub gauge_priority: u8,

    // --- ADC ---
    /// Conversion latency from sample instant to data-ready (milliseconds)
    pub conversion_delay_ms: u64,

    // --- Alarm thresholds ---
    /// CO concentration (%) above which `CoConcentrationTooHigh` is raised
    pub co_limit: f32,
    /// CH4 concentration (%) above which the pump interlock engages
    pub ch4_limit: f32,
    /// Air flow (m^3/s) below which `AirFlowTooLow` is raised
    pub air_flow_min: f32,
    /// Consecutive inconsistent monitor cycles before a pump alarm
    pub flow_anomaly_persistence: u32,

    // --- Plant ---
    /// Water level at startup (cm)
    pub initial_water_level_cm: f32,
    /// Level at or below which the plant signals level-low (cm)
    pub water_level_low_cm: f32,
    /// Level at or above which the plant signals level-high (cm)
    pub water_level_high_cm: f32,
    /// Gauge scale bounds (cm)
    pub gauge_min_cm: f32,
    pub gauge_max_cm: f32,
    /// Spontaneous inflow into the sump (cm/s)
    pub water_filling_rate: f32,
    /// Pump flow while running (cm/s, negative = outflow)
    pub pump_water_flow: f32,

    // --- Run ---
    /// How long the binary runs before shutting down (seconds, 0 = until `quit`)
    pub run_duration_secs: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Periods
            reader_period_ms: 150,
            logger_period_ms: 1000,
            pump_control_period_ms: 140,
            flow_monitor_period_ms: 140,
            plant_update_period_ms: 10,
            gauge_period_ms: 250,

            // Priorities
            co_reader_priority: 2,
            ch4_reader_priority: 4,
            air_flow_reader_priority: 3,
            water_flow_reader_priority: 5,
            logger_priority: 1,
            pump_control_priority: 6,
            flow_monitor_priority: 7,
            plant_priority: 8,
            gauge_priority: 1,

            // ADC
            conversion_delay_ms: 50,

            // Thresholds
            co_limit: 1.0,
            ch4_limit: 1.0,
            air_flow_min: 0.3,
            flow_anomaly_persistence: 9,

            // Plant
            initial_water_level_cm: 20.0,
            water_level_low_cm: 10.0,
            water_level_high_cm: 20.0,
            gauge_min_cm: 0.0,
            gauge_max_cm: 100.0,
            water_filling_rate: 1.0,
            pump_water_flow: -3.0,

            run_duration_secs: 30,
        }
    }
}

impl SystemConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            log::warn!("Config parse error: {e}");
            ConfigError::Parse {
                line: e.line(),
                column: e.column(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the control loop meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            self.reader_period_ms,
            self.logger_period_ms,
            self.pump_control_period_ms,
            self.flow_monitor_period_ms,
            self.plant_update_period_ms,
            self.gauge_period_ms,
        ];
        if periods.contains(&0) {
            return Err(ConfigError::ValidationFailed("task periods must be non-zero"));
        }
        if self.conversion_delay_ms >= self.reader_period_ms {
            return Err(ConfigError::ValidationFailed(
                "conversion delay must be shorter than the reader period",
            ));
        }
        if self.flow_anomaly_persistence == 0 {
            return Err(ConfigError::ValidationFailed(
                "flow_anomaly_persistence must be at least 1",
            ));
        }
        let limits = [self.co_limit, self.ch4_limit, self.air_flow_min];
        if limits.iter().any(|l| !l.is_finite()) {
            return Err(ConfigError::ValidationFailed("alarm limits must be finite"));
        }
        if self.water_level_low_cm >= self.water_level_high_cm {
            return Err(ConfigError::ValidationFailed(
                "water_level_low_cm must be below water_level_high_cm",
            ));
        }
        if self.gauge_min_cm >= self.gauge_max_cm {
            return Err(ConfigError::ValidationFailed("gauge bounds are inverted"));
        }
        Ok(())
    }
}
