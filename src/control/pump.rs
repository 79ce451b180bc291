//! Pump actuation sub-system.
//!
//! Two periodic contexts share one [`PumpDriver`]:
//!
//! | Task            | Reads                               | Writes                     |
//! |-----------------|-------------------------------------|----------------------------|
//! | pump controller | CH4 reading, [`PumpRequests`]       | commanded state, plant     |
//! | flow monitor    | water-flow reading, commanded state | `PumpOnNoFlow/PumpOffFlow` |
//!
//! ## Decision order (one controller cycle)
//!
//! 1. CH4 interlock: above the limit the pump is forced off and the cycle
//!    ends.  Pending requests stay pending.
//! 2. Operator request (on or off), acted on even if already in that state.
//! 3. Level-high edge: turn on if off.
//! 4. Level-low edge: turn off if on.
//! 5. Propagate the commanded state to the plant.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::debug;

use crate::app::ports::WaterLevelListener;
use crate::control::ControlCore;
use crate::control::alarms::AlarmKind;
use crate::diagnostics::TaskReport;
use crate::drivers::pump::{PumpDriver, PumpReason};
use crate::drivers::spawn::Priority;
use crate::error::TaskError;
use crate::events::{EdgeFlag, ManualRequest, PumpRequest};
use crate::safety::{FlowConsistencyMonitor, FlowVerdict};
use crate::scheduler::PeriodicTask;

/// One-shot inputs to the pump controller.
///
/// Written by the operator console and the plant's level edges, consumed
/// by the controller.  Also the plant's [`WaterLevelListener`].
#[derive(Debug, Default)]
pub struct PumpRequests {
    manual: ManualRequest,
    level_high: EdgeFlag,
    level_low: EdgeFlag,
}

impl PumpRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_manual(&self, on: bool) {
        self.manual.request(on);
    }

    pub fn manual_pending(&self) -> Option<PumpRequest> {
        self.manual.peek()
    }

    pub fn level_high_pending(&self) -> bool {
        self.level_high.is_pending()
    }

    pub fn level_low_pending(&self) -> bool {
        self.level_low.is_pending()
    }
}

impl WaterLevelListener for PumpRequests {
    fn on_water_level_high(&self) {
        self.level_high.raise();
    }

    fn on_water_level_low(&self) {
        self.level_low.raise();
    }
}

// ─── Controller ──────────────────────────────────────────────

pub struct PumpController {
    driver: Arc<PumpDriver>,
}

impl PumpController {
    pub fn new(driver: Arc<PumpDriver>) -> Self {
        Self { driver }
    }

    pub fn step(&mut self, core: &ControlCore) {
        let pump = &self.driver;
        let requests = core.pump_requests();

        if core.readings().ch4() > core.config().ch4_limit {
            if pump.is_on() {
                pump.turn_off(PumpReason::Ch4Interlock);
            }
            return;
        }

        match requests.manual.take() {
            Some(PumpRequest::On) => pump.turn_on(PumpReason::Operator),
            Some(PumpRequest::Off) => pump.turn_off(PumpReason::Operator),
            None => {}
        }

        if requests.level_high.take() && !pump.is_on() {
            pump.turn_on(PumpReason::WaterLevelHigh);
        }

        if requests.level_low.take() && pump.is_on() {
            pump.turn_off(PumpReason::WaterLevelLow);
        }

        pump.propagate();
    }
}

// ─── Flow monitor ────────────────────────────────────────────

pub struct FlowMonitor {
    commanded: Arc<AtomicBool>,
    consistency: FlowConsistencyMonitor,
}

impl FlowMonitor {
    pub fn new(commanded: Arc<AtomicBool>, persistence: u32) -> Self {
        Self {
            commanded,
            consistency: FlowConsistencyMonitor::new(persistence),
        }
    }

    pub fn step(&mut self, core: &ControlCore) {
        let on = self.commanded.load(Ordering::Acquire);
        let measured = core.readings().water_flow();

        match self.consistency.evaluate(on, measured) {
            FlowVerdict::Consistent => {
                core.clear(AlarmKind::PumpOnNoFlow);
                core.clear(AlarmKind::PumpOffFlow);
            }
            FlowVerdict::Suspect(kind) => {
                debug!(
                    "Flow anomaly {} ({}/{})",
                    kind,
                    self.consistency.anomaly_count(),
                    self.consistency.persistence()
                );
            }
            FlowVerdict::Persistent(kind) => {
                core.raise(kind);
            }
        }
    }

    pub fn anomaly_count(&self) -> u32 {
        self.consistency.anomaly_count()
    }
}

// ─── Sub-system ──────────────────────────────────────────────

/// Owns the pump driver and its two periodic tasks.
pub struct PumpActuationSubsystem {
    driver: Arc<PumpDriver>,
    tasks: Vec<PeriodicTask>,
}

impl PumpActuationSubsystem {
    pub fn new(core: Arc<ControlCore>) -> Self {
        let cfg = core.config().clone();
        let driver = Arc::new(PumpDriver::new(core.plant(), core.sink()));

        let mut controller = PumpController::new(Arc::clone(&driver));
        let controller_core = Arc::clone(&core);
        let control_task = PeriodicTask::new(
            "pump-controller",
            Duration::from_millis(cfg.pump_control_period_ms),
            Priority(cfg.pump_control_priority),
            move || controller.step(&controller_core),
        );

        let mut monitor = FlowMonitor::new(driver.commanded(), cfg.flow_anomaly_persistence);
        let monitor_task = PeriodicTask::new(
            "flow-monitor",
            Duration::from_millis(cfg.flow_monitor_period_ms),
            Priority(cfg.flow_monitor_priority),
            move || monitor.step(&core),
        );

        Self {
            driver,
            tasks: vec![control_task, monitor_task],
        }
    }

    pub fn start(&mut self) -> Result<(), TaskError> {
        for task in &mut self.tasks {
            task.start()?;
        }
        Ok(())
    }

    /// Stop both tasks and return their statistics.
    pub fn stop(&mut self) -> TaskReport {
        let mut report = TaskReport::new();
        for task in &mut self.tasks {
            task.stop();
            report.push(task.stats());
        }
        report
    }

    pub fn is_pump_on(&self) -> bool {
        self.driver.is_on()
    }

    pub fn driver(&self) -> &Arc<PumpDriver> {
        &self.driver
    }
}
