//! End-to-end runs of the full simulation on real threads.

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use minewatch::app::commands::OperatorCommand;
use minewatch::app::ports::DashboardSink;
use minewatch::app::service::{CommandOutcome, Simulation};
use minewatch::config::SystemConfig;
use minewatch::control::alarms::AlarmKind;
use minewatch::error::{ConfigError, Error};
use minewatch::sensors::ChannelId;

use crate::mock_hw::RecordingSink;

fn simulation() -> (Simulation, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let port: Arc<dyn DashboardSink> = sink.clone();
    let sim = Simulation::new(SystemConfig::default(), port).unwrap();
    (sim, sink)
}

#[test]
fn initial_high_level_starts_the_pump() {
    let (mut sim, sink) = simulation();
    sim.start().unwrap();
    sleep(Duration::from_millis(800));
    let report = sim.stop();

    // The sump starts at the high mark and CH4 is still at baseline.
    assert!(sink.logs_containing("PUMP ON - WATER LEVEL HIGH") >= 1);
    assert_eq!(sink.pump_indicator_updates().first(), Some(&true));
    assert!(sink.logs_containing("CO: ") >= 1, "logger never ran");
    assert!(sink.gauge_updates() >= 1);

    assert_eq!(report.len(), 9);
    assert_eq!(report.failed().count(), 0);
    for stats in report.iter() {
        assert!(stats.cycles > 0, "{} never ran", stats.name);
    }
}

#[test]
fn injected_fault_raises_and_fix_clears_sensor_alarm() {
    let (mut sim, sink) = simulation();
    sim.start().unwrap();
    sleep(Duration::from_millis(200));

    sim.handle_command(OperatorCommand::InjectFault(ChannelId::AirFlow));
    sleep(Duration::from_millis(500));
    assert!(sim.core().alarms().is_active(AlarmKind::AirFlowSensorFault));

    sim.handle_command(OperatorCommand::ClearFault(ChannelId::AirFlow));
    sleep(Duration::from_millis(500));
    assert!(!sim.core().alarms().is_active(AlarmKind::AirFlowSensorFault));

    sim.stop();
    assert_eq!(sink.shown(AlarmKind::AirFlowSensorFault), 1);
    assert_eq!(sink.cleared(AlarmKind::AirFlowSensorFault), 1);
}

#[test]
fn quit_command_requests_shutdown() {
    let (sim, _) = simulation();
    assert_eq!(sim.handle_command(OperatorCommand::Status), CommandOutcome::Continue);
    assert_eq!(sim.handle_command(OperatorCommand::Quit), CommandOutcome::Quit);
}

#[test]
fn simulation_starts_only_once() {
    let (mut sim, _) = simulation();
    sim.start().unwrap();
    assert!(sim.start().is_err());
    sim.stop();
}

#[test]
fn invalid_config_is_rejected() {
    let config = SystemConfig {
        reader_period_ms: 0,
        ..SystemConfig::default()
    };
    let sink: Arc<dyn DashboardSink> = Arc::new(RecordingSink::new());
    match Simulation::new(config, sink) {
        Err(Error::Config(ConfigError::ValidationFailed(_))) => {}
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("zero reader period accepted"),
    }
}
