//! Simulation service: wires the plant, the control kernel and the
//! dashboard together and owns every periodic task.
//!
//! ```text
//!                ┌──────────────── Simulation ────────────────┐
//!  SimulatedPlant│  plant-update ─▶ SimulatedPlant.update()   │
//!        ▲       │  gauge        ─▶ sink.update_gauge()       │
//!        │       │  ControlSystem (4 readers + logger)        │──▶ DashboardSink
//!        └───────│  PumpActuationSubsystem (ctrl + monitor)   │
//!                └────────────────────────────────────────────┘
//!                          ▲ OperatorCommand
//! ```
//!
//! Nothing is global: the plant, hub and control core are built once in
//! [`Simulation::new`] and shared by `Arc`.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::adapters::plant::SimulatedPlant;
use crate::adapters::time::MonotonicClock;
use crate::config::SystemConfig;
use crate::control::pump::PumpActuationSubsystem;
use crate::control::{ControlCore, ControlSystem};
use crate::diagnostics::TaskReport;
use crate::drivers::spawn::Priority;
use crate::error::{Result, TaskError};
use crate::scheduler::PeriodicTask;

use super::commands::OperatorCommand;
use super::ports::{DashboardSink, Plant, TimeSource};

/// What the caller should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Quit,
}

pub struct Simulation {
    plant: Arc<SimulatedPlant>,
    core: Arc<ControlCore>,
    control: ControlSystem,
    pump: PumpActuationSubsystem,
    plant_task: PeriodicTask,
    gauge_task: PeriodicTask,
    started: bool,
}

impl Simulation {
    /// Build the simulation on the wall clock.
    pub fn new(config: SystemConfig, sink: Arc<dyn DashboardSink>) -> Result<Self> {
        Self::with_clock(config, sink, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        config: SystemConfig,
        sink: Arc<dyn DashboardSink>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        config.validate()?;

        let plant = Arc::new(SimulatedPlant::new(&config));
        let plant_port: Arc<dyn Plant> = plant.clone();
        let core = Arc::new(ControlCore::new(config.clone(), plant_port, Arc::clone(&sink), clock));
        plant.attach_listener(core.pump_requests().clone());

        let control = ControlSystem::new(Arc::clone(&core));
        let pump = PumpActuationSubsystem::new(Arc::clone(&core));

        let dt_ms = config.plant_update_period_ms as f32;
        let update_plant = Arc::clone(&plant);
        let plant_task = PeriodicTask::new(
            "plant-update",
            Duration::from_millis(config.plant_update_period_ms),
            Priority(config.plant_priority),
            move || update_plant.update(dt_ms),
        );

        let gauge_plant = Arc::clone(&plant);
        let (gauge_min, gauge_max) = (config.gauge_min_cm, config.gauge_max_cm);
        let gauge_task = PeriodicTask::new(
            "gauge",
            Duration::from_millis(config.gauge_period_ms),
            Priority(config.gauge_priority),
            move || sink.update_water_level_gauge(gauge_plant.water_level(), gauge_min, gauge_max),
        );

        Ok(Self {
            plant,
            core,
            control,
            pump,
            plant_task,
            gauge_task,
            started: false,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the plant first so readers sample a live process.
    pub fn start(&mut self) -> core::result::Result<(), TaskError> {
        if self.started {
            return Err(TaskError::AlreadyStarted("simulation"));
        }
        self.started = true;
        self.plant_task.start()?;
        self.control.start()?;
        self.pump.start()?;
        self.gauge_task.start()?;
        info!("Simulation running");
        Ok(())
    }

    /// Stop every task (actuation first) and collect their statistics.
    pub fn stop(&mut self) -> TaskReport {
        let mut report = self.pump.stop();
        report.append(&self.control.stop());

        self.gauge_task.stop();
        self.plant_task.stop();
        report.push(self.plant_task.stats());
        report.push(self.gauge_task.stats());

        info!("Simulation stopped");
        report
    }

    // ── Operator commands ─────────────────────────────────────

    pub fn handle_command(&self, cmd: OperatorCommand) -> CommandOutcome {
        match cmd {
            OperatorCommand::InjectFault(ch) => self.core.inject_sensor_fault(ch),
            OperatorCommand::ClearFault(ch) => self.core.clear_sensor_fault(ch),
            OperatorCommand::ManualPump(on) => self.core.request_manual_pump(on),
            OperatorCommand::SetPumpFaulty(faulty) => self.core.set_pump_faulty(faulty),
            OperatorCommand::Status => self.log_status(),
            OperatorCommand::Quit => return CommandOutcome::Quit,
        }
        CommandOutcome::Continue
    }

    fn log_status(&self) {
        info!("STATUS | {}", self.core.telemetry());
        info!(
            "STATUS | pump={} plant_t={:.0}ms",
            if self.pump.is_pump_on() { "ON" } else { "OFF" },
            self.plant.elapsed_time()
        );
        let active = self.core.alarms().active();
        if active.is_empty() {
            info!("STATUS | no active alarms");
        } else {
            for kind in &active {
                warn!("STATUS | active alarm {kind}");
            }
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn core(&self) -> &Arc<ControlCore> {
        &self.core
    }

    pub fn plant(&self) -> &Arc<SimulatedPlant> {
        &self.plant
    }

    pub fn is_pump_on(&self) -> bool {
        self.pump.is_pump_on()
    }
}
