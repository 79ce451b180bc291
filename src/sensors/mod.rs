//! Sensor subsystem: the simulated ADC channels and the aggregating [`SensorHub`].
//!
//! The hub plays the role of the controller's MCU: it owns one ADC channel
//! per measured quantity, binds each channel to the matching plant signal,
//! and routes operator fault-injection commands by channel number.

pub mod adc;

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::app::ports::{Plant, TimeSource};
use crate::error::SensorError;
use adc::SimulatedSensorChannel;

/// Channel numbering as printed on the controller's front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelId {
    Co = 1,
    Ch4 = 2,
    AirFlow = 3,
    WaterFlow = 4,
}

impl ChannelId {
    pub const ALL: [ChannelId; 4] = [Self::Co, Self::Ch4, Self::AirFlow, Self::WaterFlow];

    pub const fn number(self) -> u8 {
        self as u8
    }

    const fn index(self) -> usize {
        self as usize - 1
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = SensorError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Self::Co),
            2 => Ok(Self::Ch4),
            3 => Ok(Self::AirFlow),
            4 => Ok(Self::WaterFlow),
            other => Err(SensorError::UnknownChannel(other)),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Co => write!(f, "CO"),
            Self::Ch4 => write!(f, "CH4"),
            Self::AirFlow => write!(f, "air flow"),
            Self::WaterFlow => write!(f, "water flow"),
        }
    }
}

/// Owns the four ADC channels.
pub struct SensorHub {
    channels: [SimulatedSensorChannel; 4],
}

impl SensorHub {
    /// Build the hub with every channel bound to its plant signal.
    pub fn new(plant: &Arc<dyn Plant>, clock: &Arc<dyn TimeSource>, delay: Duration) -> Self {
        let bind = |name: &'static str, signal: fn(&dyn Plant) -> f32| {
            let plant = Arc::clone(plant);
            SimulatedSensorChannel::new(
                name,
                Box::new(move || signal(plant.as_ref())),
                Arc::clone(clock),
                delay,
            )
        };

        Self {
            channels: [
                bind("adc1-co", |p: &dyn Plant| p.co_concentration()),
                bind("adc2-ch4", |p: &dyn Plant| p.ch4_concentration()),
                bind("adc3-air-flow", |p: &dyn Plant| p.air_flow()),
                bind("adc4-water-flow", |p: &dyn Plant| p.pump_flow()),
            ],
        }
    }

    pub fn channel(&self, id: ChannelId) -> &SimulatedSensorChannel {
        &self.channels[id.index()]
    }

    pub fn inject_fault(&self, id: ChannelId) {
        self.channel(id).inject_fault();
    }

    pub fn clear_fault(&self, id: ChannelId) {
        self.channel(id).clear_fault();
    }

    /// Start a conversion on every channel (used once at startup).
    pub fn prime_all(&self) {
        for channel in &self.channels {
            channel.start_conversion();
        }
    }
}
