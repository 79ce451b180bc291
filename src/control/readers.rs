//! Per-sensor reader cycle.
//!
//! Each reader task runs one [`SensorReader::step`] per period:
//!
//! ```text
//!   status ──▶ debounce ──▶ (ready) read ──▶ publish ──▶ threshold ──▶ start_conversion
//!                 │
//!                 └──▶ (not ready twice) raise sensor fault
//! ```
//!
//! The conversion for the *next* cycle is started at the end of this one,
//! so the value read at release k was sampled at the end of cycle k-1.

use log::{debug, error};

use crate::config::SystemConfig;
use crate::control::ControlCore;
use crate::control::alarms::AlarmKind;
use crate::sensors::ChannelId;

/// What the debounce asks the caller to do with the fault alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceAction {
    Raise,
    Clear,
    Hold,
}

/// Two-sample fault debounce.
///
/// A fault is reported only after two consecutive non-ready samples and
/// withdrawn on the first ready one.
#[derive(Debug, Clone, Copy)]
pub struct FaultDebounce {
    prev_ready: bool,
}

impl Default for FaultDebounce {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultDebounce {
    /// The previous sample starts out as "ready".
    pub const fn new() -> Self {
        Self { prev_ready: true }
    }

    pub fn observe(&mut self, ready: bool) -> DebounceAction {
        let action = match (ready, self.prev_ready) {
            (true, _) => DebounceAction::Clear,
            (false, false) => DebounceAction::Raise,
            (false, true) => DebounceAction::Hold,
        };
        self.prev_ready = ready;
        action
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    /// Alarm while the value is strictly above the limit.
    Above(f32),
    /// Alarm while the value is strictly below the limit.
    Below(f32),
}

impl Limit {
    pub fn exceeded_by(self, value: f32) -> bool {
        match self {
            Self::Above(limit) => value > limit,
            Self::Below(limit) => value < limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub alarm: AlarmKind,
    pub limit: Limit,
}

pub struct SensorReader {
    channel: ChannelId,
    fault_alarm: AlarmKind,
    threshold: Option<Threshold>,
    debounce: FaultDebounce,
}

impl SensorReader {
    pub fn new(channel: ChannelId, fault_alarm: AlarmKind, threshold: Option<Threshold>) -> Self {
        Self {
            channel,
            fault_alarm,
            threshold,
            debounce: FaultDebounce::new(),
        }
    }

    /// Reader for `channel` with the alarms and limits from `config`.
    pub fn for_channel(channel: ChannelId, config: &SystemConfig) -> Self {
        match channel {
            ChannelId::Co => Self::new(
                channel,
                AlarmKind::CoSensorFault,
                Some(Threshold {
                    alarm: AlarmKind::CoConcentrationTooHigh,
                    limit: Limit::Above(config.co_limit),
                }),
            ),
            ChannelId::Ch4 => Self::new(
                channel,
                AlarmKind::Ch4SensorFault,
                Some(Threshold {
                    alarm: AlarmKind::Ch4ConcentrationTooHigh,
                    limit: Limit::Above(config.ch4_limit),
                }),
            ),
            ChannelId::AirFlow => Self::new(
                channel,
                AlarmKind::AirFlowSensorFault,
                Some(Threshold {
                    alarm: AlarmKind::AirFlowTooLow,
                    limit: Limit::Below(config.air_flow_min),
                }),
            ),
            ChannelId::WaterFlow => Self::new(channel, AlarmKind::WaterFlowSensorFault, None),
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Run one reader cycle against the shared control state.
    pub fn step(&mut self, core: &ControlCore) {
        let adc = core.hub().channel(self.channel);
        let status = adc.status();

        match self.debounce.observe(status.is_ready()) {
            DebounceAction::Raise => {
                core.raise(self.fault_alarm);
            }
            DebounceAction::Clear => {
                core.clear(self.fault_alarm);
                self.take_sample(core);
            }
            DebounceAction::Hold => {
                debug!("{} sensor not ready ({:?}), waiting one cycle", self.channel, status);
            }
        }

        adc.start_conversion();
    }

    fn take_sample(&self, core: &ControlCore) {
        let value = match core.hub().channel(self.channel).read_value() {
            Ok(v) => v,
            Err(e) => {
                error!("{} sensor reported ready but read failed: {}", self.channel, e);
                return;
            }
        };

        core.readings().publish(self.channel, value);

        if let Some(t) = self.threshold {
            if t.limit.exceeded_by(value) {
                core.raise(t.alarm);
            } else {
                core.clear(t.alarm);
            }
        }
    }
}
