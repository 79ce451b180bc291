//! Simulated ADC channel.
//!
//! Models only the timing/fault contract of a successive-approximation ADC:
//!
//! - `start_conversion()` samples the bound signal *immediately* and the
//!   value becomes readable a fixed delay later;
//! - at most one conversion is in flight;
//! - `read_value()` consumes the sample (a second read without a new
//!   conversion fails);
//! - an injected fault makes `status()` report `FailedConversion` for as
//!   long as it is set.  A conversion already in flight still completes.
//!
//! Completion is evaluated lazily against a [`TimeSource`] whenever the
//! channel is queried, so no timer thread is needed per channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::app::ports::TimeSource;
use crate::error::SensorError;

/// Default conversion latency.
pub const CONVERSION_DELAY: Duration = Duration::from_millis(50);

/// Pull-based signal the channel samples.
pub type SignalSource = Box<dyn Fn() -> f32 + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    DataReady,
    DataNotReady,
    FailedConversion,
}

impl ChannelStatus {
    pub fn is_ready(self) -> bool {
        self == Self::DataReady
    }
}

#[derive(Debug, Default)]
struct Conversion {
    /// Completion instant of the conversion in flight, if any.
    completes_at: Option<Instant>,
    data_ready: bool,
    value: f32,
}

impl Conversion {
    /// Promote a finished conversion to data-ready.
    fn settle(&mut self, now: Instant) {
        if let Some(at) = self.completes_at {
            if now >= at {
                self.completes_at = None;
                self.data_ready = true;
            }
        }
    }

    fn in_progress(&self) -> bool {
        self.completes_at.is_some()
    }
}

pub struct SimulatedSensorChannel {
    name: &'static str,
    source: SignalSource,
    clock: Arc<dyn TimeSource>,
    delay: Duration,
    conversion: Mutex<Conversion>,
    faulted: AtomicBool,
}

impl SimulatedSensorChannel {
    pub fn new(
        name: &'static str,
        source: SignalSource,
        clock: Arc<dyn TimeSource>,
        delay: Duration,
    ) -> Self {
        Self {
            name,
            source,
            clock,
            delay,
            conversion: Mutex::new(Conversion::default()),
            faulted: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Sample the signal now and schedule completion.  No-op while a
    /// conversion is already in flight.
    pub fn start_conversion(&self) {
        let now = self.clock.now();
        let mut conv = self.lock();
        conv.settle(now);
        if conv.in_progress() {
            return;
        }
        conv.value = (self.source)();
        conv.data_ready = false;
        conv.completes_at = Some(now + self.delay);
    }

    pub fn status(&self) -> ChannelStatus {
        if self.is_faulted() {
            return ChannelStatus::FailedConversion;
        }
        let now = self.clock.now();
        let mut conv = self.lock();
        conv.settle(now);
        if conv.data_ready {
            ChannelStatus::DataReady
        } else {
            ChannelStatus::DataNotReady
        }
    }

    /// Return the last completed sample and clear data-ready.
    pub fn read_value(&self) -> Result<f32, SensorError> {
        let now = self.clock.now();
        let mut conv = self.lock();
        conv.settle(now);
        if !conv.data_ready {
            return Err(SensorError::DataNotReady);
        }
        conv.data_ready = false;
        Ok(conv.value)
    }

    pub fn inject_fault(&self) {
        if !self.faulted.swap(true, Ordering::AcqRel) {
            log::info!("ADC '{}': fault injected", self.name);
        }
    }

    pub fn clear_fault(&self) {
        if self.faulted.swap(false, Ordering::AcqRel) {
            log::info!("ADC '{}': fault cleared", self.name);
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Conversion> {
        self.conversion.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
