//! Control system: sensor readers, alarm management, telemetry logger.
//!
//! All state shared between periodic contexts lives in one
//! [`ControlCore`], built once and handed to every task as an `Arc`.
//!
//! ```text
//!  reader tasks ──publish──▶ SensorReadings ──▶ pump controller / flow monitor
//!        │                                              │
//!        └──────── raise / clear ──▶ AlarmSet ◀─────────┘
//!                                       │
//!                                       ▼
//!                                DashboardSink
//! ```

pub mod alarms;
pub mod pump;
pub mod readers;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use log::info;

use crate::app::events::Telemetry;
use crate::app::ports::{DashboardSink, Plant, TimeSource};
use crate::config::SystemConfig;
use crate::diagnostics::TaskReport;
use crate::drivers::spawn::Priority;
use crate::error::TaskError;
use crate::scheduler::PeriodicTask;
use crate::sensors::{ChannelId, SensorHub};
use alarms::{AlarmKind, AlarmSet};
use pump::PumpRequests;
use readers::SensorReader;

/// `f32` stored as raw bits.  Loads never tear; staleness is acceptable.
#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Latest published value of every sensor.
#[derive(Debug, Default)]
pub struct SensorReadings {
    co: AtomicF32,
    ch4: AtomicF32,
    air_flow: AtomicF32,
    water_flow: AtomicF32,
}

impl SensorReadings {
    pub fn publish(&self, channel: ChannelId, value: f32) {
        self.slot(channel).store(value);
    }

    pub fn co(&self) -> f32 {
        self.co.load()
    }

    pub fn ch4(&self) -> f32 {
        self.ch4.load()
    }

    pub fn air_flow(&self) -> f32 {
        self.air_flow.load()
    }

    pub fn water_flow(&self) -> f32 {
        self.water_flow.load()
    }

    fn slot(&self, channel: ChannelId) -> &AtomicF32 {
        match channel {
            ChannelId::Co => &self.co,
            ChannelId::Ch4 => &self.ch4,
            ChannelId::AirFlow => &self.air_flow,
            ChannelId::WaterFlow => &self.water_flow,
        }
    }
}

/// Shared control state plus the operator control surface.
pub struct ControlCore {
    config: SystemConfig,
    plant: Arc<dyn Plant>,
    sink: Arc<dyn DashboardSink>,
    hub: SensorHub,
    alarms: AlarmSet,
    readings: SensorReadings,
    pump_requests: Arc<PumpRequests>,
}

impl ControlCore {
    pub fn new(
        config: SystemConfig,
        plant: Arc<dyn Plant>,
        sink: Arc<dyn DashboardSink>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let hub = SensorHub::new(
            &plant,
            &clock,
            Duration::from_millis(config.conversion_delay_ms),
        );
        Self {
            config,
            alarms: AlarmSet::new(Arc::clone(&sink)),
            plant,
            sink,
            hub,
            readings: SensorReadings::default(),
            pump_requests: Arc::new(PumpRequests::new()),
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn hub(&self) -> &SensorHub {
        &self.hub
    }

    pub fn plant(&self) -> Arc<dyn Plant> {
        Arc::clone(&self.plant)
    }

    pub fn sink(&self) -> Arc<dyn DashboardSink> {
        Arc::clone(&self.sink)
    }

    pub fn alarms(&self) -> &AlarmSet {
        &self.alarms
    }

    pub fn readings(&self) -> &SensorReadings {
        &self.readings
    }

    pub fn pump_requests(&self) -> &Arc<PumpRequests> {
        &self.pump_requests
    }

    pub fn raise(&self, kind: AlarmKind) -> bool {
        self.alarms.raise(kind)
    }

    pub fn clear(&self, kind: AlarmKind) -> bool {
        self.alarms.clear(kind)
    }

    // ── Operator control surface ──────────────────────────────

    pub fn request_manual_pump(&self, on: bool) {
        info!("Operator requested pump {}", if on { "on" } else { "off" });
        self.pump_requests.request_manual(on);
    }

    pub fn inject_sensor_fault(&self, channel: ChannelId) {
        self.hub.inject_fault(channel);
    }

    pub fn clear_sensor_fault(&self, channel: ChannelId) {
        self.hub.clear_fault(channel);
    }

    pub fn set_pump_faulty(&self, faulty: bool) {
        info!("Pump marked {}", if faulty { "faulty" } else { "healthy" });
        self.plant.set_pump_faulty(faulty);
    }

    /// Current readings plus the plant's water level.
    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            co: self.readings.co(),
            ch4: self.readings.ch4(),
            air_flow: self.readings.air_flow(),
            water_flow: self.readings.water_flow(),
            water_level: self.plant.water_level(),
        }
    }
}

/// The four sensor readers and the telemetry logger.
pub struct ControlSystem {
    core: Arc<ControlCore>,
    tasks: Vec<PeriodicTask>,
}

impl ControlSystem {
    pub fn new(core: Arc<ControlCore>) -> Self {
        let cfg = core.config();
        let reader_period = Duration::from_millis(cfg.reader_period_ms);

        let readers = [
            (ChannelId::Co, "co-reader", cfg.co_reader_priority),
            (ChannelId::Ch4, "ch4-reader", cfg.ch4_reader_priority),
            (ChannelId::AirFlow, "air-flow-reader", cfg.air_flow_reader_priority),
            (ChannelId::WaterFlow, "water-flow-reader", cfg.water_flow_reader_priority),
        ];

        let mut tasks: Vec<PeriodicTask> = readers
            .into_iter()
            .map(|(channel, name, priority)| {
                let mut reader = SensorReader::for_channel(channel, cfg);
                let core = Arc::clone(&core);
                PeriodicTask::new(name, reader_period, Priority(priority), move || {
                    reader.step(&core)
                })
            })
            .collect();

        let logger_core = Arc::clone(&core);
        tasks.push(PeriodicTask::new(
            "logger",
            Duration::from_millis(cfg.logger_period_ms),
            Priority(cfg.logger_priority),
            move || logger_core.sink().log(&logger_core.telemetry().to_string()),
        ));

        Self { core, tasks }
    }

    pub fn core(&self) -> &Arc<ControlCore> {
        &self.core
    }

    /// Prime every ADC channel, then start the reader and logger tasks.
    pub fn start(&mut self) -> Result<(), TaskError> {
        self.core.hub().prime_all();
        for task in &mut self.tasks {
            task.start()?;
        }
        info!("Control system started ({} tasks)", self.tasks.len());
        Ok(())
    }

    /// Stop every task and return their statistics.
    pub fn stop(&mut self) -> TaskReport {
        let mut report = TaskReport::new();
        for task in &mut self.tasks {
            task.stop();
            report.push(task.stats());
        }
        report
    }
}
