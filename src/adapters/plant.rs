//! Deterministic plant model (the mine sump and its atmosphere).
//!
//! Implements [`Plant`] for the sensor hub and the pump driver, and is
//! advanced by the plant-update task with [`SimulatedPlant::update`].
//!
//! ## Signal profiles (t = simulated milliseconds)
//!
//! | Signal   | Profile                                             |
//! |----------|-----------------------------------------------------|
//! | CO       | 0.01 % until 2 s, 1.2 % until 8 s, then 0.01 %      |
//! | CH4      | 0.1 % baseline, +1.2 % between 2 s and 16 s         |
//! | Air flow | `sin(t / 2000) + 1` m^3/s                           |
//! | Level    | integrates inflow + pump flow, clamped to 0..=100 cm |
//!
//! Level-high / level-low are reported to the attached
//! [`WaterLevelListener`] on the update that *enters* the band, not on
//! every update spent inside it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};

use crate::app::ports::{Plant, WaterLevelListener};
use crate::config::SystemConfig;

const INITIAL_CO: f32 = 0.5;
const INITIAL_CH4: f32 = 0.1;
const INITIAL_AIR_FLOW: f32 = 1.0;
const LEVEL_MAX_CM: f32 = 100.0;

fn step(t_ms: f32) -> f32 {
    if t_ms < 0.0 { 0.0 } else { 1.0 }
}

/// CO concentration (%) at `t_ms`.
pub fn co_profile(t_ms: f32) -> f32 {
    match t_ms {
        t if t < 0.0 => INITIAL_CO,
        t if t < 2000.0 => 0.01,
        t if t < 8000.0 => 1.2,
        _ => 0.01,
    }
}

/// CH4 concentration (%) at `t_ms`.
pub fn ch4_profile(t_ms: f32) -> f32 {
    step(t_ms) * INITIAL_CH4 + 1.2 * (step(t_ms - 2000.0) - step(t_ms - 16000.0))
}

/// Air flow (m^3/s) at `t_ms`.
pub fn air_flow_profile(t_ms: f32) -> f32 {
    if t_ms < 0.0 {
        return INITIAL_AIR_FLOW;
    }
    (t_ms / 2000.0).sin() + 1.0
}

#[derive(Debug)]
struct PlantState {
    elapsed_ms: f32,
    co: f32,
    ch4: f32,
    air_flow: f32,
    water_level: f32,
    pump_on: bool,
    pump_flow: f32,
    pump_working: bool,
    above_high: bool,
    below_low: bool,
}

pub struct SimulatedPlant {
    state: Mutex<PlantState>,
    listener: Mutex<Option<Arc<dyn WaterLevelListener>>>,
    filling_rate: f32,
    pump_water_flow: f32,
    level_low: f32,
    level_high: f32,
}

impl SimulatedPlant {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            state: Mutex::new(PlantState {
                elapsed_ms: 0.0,
                co: INITIAL_CO,
                ch4: INITIAL_CH4,
                air_flow: INITIAL_AIR_FLOW,
                water_level: config.initial_water_level_cm,
                pump_on: false,
                pump_flow: 0.0,
                pump_working: true,
                above_high: false,
                below_low: false,
            }),
            listener: Mutex::new(None),
            filling_rate: config.water_filling_rate,
            pump_water_flow: config.pump_water_flow,
            level_low: config.water_level_low_cm,
            level_high: config.water_level_high_cm,
        }
    }

    /// Register the receiver of level-high / level-low edges.
    pub fn attach_listener(&self, listener: Arc<dyn WaterLevelListener>) {
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Advance the model by `dt_ms` simulated milliseconds.
    pub fn update(&self, dt_ms: f32) {
        let (entered_high, entered_low) = {
            let mut s = self.lock();
            s.elapsed_ms += dt_ms;

            let mut inflow = self.filling_rate;
            if s.pump_on {
                inflow += s.pump_flow;
            }
            s.water_level = (s.water_level + inflow * dt_ms * 0.001).clamp(0.0, LEVEL_MAX_CM);

            s.air_flow = air_flow_profile(s.elapsed_ms);
            s.co = co_profile(s.elapsed_ms);
            s.ch4 = ch4_profile(s.elapsed_ms);

            let high = s.water_level >= self.level_high;
            let low = s.water_level <= self.level_low;
            let entered_high = high && !s.above_high;
            let entered_low = low && !s.below_low;
            s.above_high = high;
            s.below_low = low;
            (entered_high, entered_low)
        };

        // Listener runs outside the state lock.
        if !(entered_high || entered_low) {
            return;
        }
        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(listener) = listener else {
            return;
        };
        if entered_high {
            debug!("Plant: water level high edge");
            listener.on_water_level_high();
        }
        if entered_low {
            debug!("Plant: water level low edge");
            listener.on_water_level_low();
        }
    }

    pub fn is_pump_running(&self) -> bool {
        self.lock().pump_on
    }

    fn lock(&self) -> MutexGuard<'_, PlantState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Plant for SimulatedPlant {
    fn co_concentration(&self) -> f32 {
        self.lock().co
    }

    fn ch4_concentration(&self) -> f32 {
        self.lock().ch4
    }

    fn air_flow(&self) -> f32 {
        self.lock().air_flow
    }

    fn pump_flow(&self) -> f32 {
        self.lock().pump_flow
    }

    fn water_level(&self) -> f32 {
        self.lock().water_level
    }

    fn elapsed_time(&self) -> f32 {
        self.lock().elapsed_ms
    }

    fn turn_pump_on(&self) {
        let mut s = self.lock();
        if s.pump_working {
            s.pump_on = true;
            s.pump_flow = self.pump_water_flow;
        }
    }

    fn turn_pump_off(&self) {
        let mut s = self.lock();
        if s.pump_working {
            s.pump_on = false;
            s.pump_flow = 0.0;
        }
    }

    fn set_pump_faulty(&self, faulty: bool) {
        let mut s = self.lock();
        if s.pump_working == faulty {
            info!("Plant: pump {}", if faulty { "broke down" } else { "repaired" });
        }
        s.pump_working = !faulty;
    }
}
