//! Sensor reader cycles: debounce, thresholds, publication.
//!
//! Every test drives `SensorReader::step` by hand on a manual clock, so
//! conversion latency is exact.

use minewatch::control::alarms::AlarmKind;
use minewatch::control::readers::SensorReader;
use minewatch::error::SensorError;
use minewatch::events::PumpRequest;
use minewatch::sensors::ChannelId;

use crate::mock_hw::Rig;

fn reader(rig: &Rig, channel: ChannelId) -> SensorReader {
    SensorReader::for_channel(channel, rig.core.config())
}

/// Prime every channel and let the first conversion finish.
fn primed() -> Rig {
    let rig = Rig::new();
    rig.core.hub().prime_all();
    rig.settle();
    rig
}

#[test]
fn healthy_cycle_publishes_reading() {
    let rig = Rig::new();
    rig.plant.set_co(0.4);
    rig.core.hub().prime_all();
    rig.settle();

    let mut co = reader(&rig, ChannelId::Co);
    co.step(&rig.core);

    assert!((rig.core.readings().co() - 0.4).abs() < f32::EPSILON);
    assert!(rig.core.alarms().is_empty());
}

#[test]
fn single_not_ready_cycle_raises_nothing() {
    let rig = primed();
    let mut co = reader(&rig, ChannelId::Co);
    co.step(&rig.core);

    rig.core.inject_sensor_fault(ChannelId::Co);
    co.step(&rig.core);
    rig.core.clear_sensor_fault(ChannelId::Co);
    rig.settle();
    co.step(&rig.core);

    assert_eq!(rig.sink.shown(AlarmKind::CoSensorFault), 0);
    assert_eq!(rig.sink.cleared(AlarmKind::CoSensorFault), 0);
}

#[test]
fn two_consecutive_not_ready_cycles_raise_once() {
    let rig = primed();
    let mut co = reader(&rig, ChannelId::Co);
    co.step(&rig.core);

    rig.core.inject_sensor_fault(ChannelId::Co);
    co.step(&rig.core);
    co.step(&rig.core);
    co.step(&rig.core);

    assert!(rig.core.alarms().is_active(AlarmKind::CoSensorFault));
    assert_eq!(rig.sink.shown(AlarmKind::CoSensorFault), 1);
}

#[test]
fn clearing_fault_resumes_normal_operation() {
    let rig = primed();
    let mut co = reader(&rig, ChannelId::Co);
    co.step(&rig.core);

    rig.core.inject_sensor_fault(ChannelId::Co);
    co.step(&rig.core);
    co.step(&rig.core);
    assert!(rig.core.alarms().is_active(AlarmKind::CoSensorFault));

    rig.core.clear_sensor_fault(ChannelId::Co);
    rig.plant.set_co(0.2);
    rig.settle();
    co.step(&rig.core);
    assert!(!rig.core.alarms().is_active(AlarmKind::CoSensorFault));
    assert_eq!(rig.sink.cleared(AlarmKind::CoSensorFault), 1);

    // Next cycle reads the value sampled at the end of the previous one.
    rig.settle();
    co.step(&rig.core);
    assert!((rig.core.readings().co() - 0.2).abs() < f32::EPSILON);
    assert!(rig.core.alarms().is_empty());
}

#[test]
fn stalled_conversion_is_reported_as_sensor_fault() {
    let rig = Rig::new();
    let mut water = reader(&rig, ChannelId::WaterFlow);

    // Clock never advances: the conversion never completes.
    water.step(&rig.core);
    water.step(&rig.core);

    assert!(rig.core.alarms().is_active(AlarmKind::WaterFlowSensorFault));
}

#[test]
fn co_threshold_raises_and_clears_with_one_cycle_lag() {
    let rig = Rig::new();
    rig.plant.set_co(1.5);
    rig.core.hub().prime_all();
    let mut co = reader(&rig, ChannelId::Co);

    rig.settle();
    co.step(&rig.core);
    assert!(rig.core.alarms().is_active(AlarmKind::CoConcentrationTooHigh));

    rig.plant.set_co(0.5);
    rig.settle();
    co.step(&rig.core); // reads the 1.5 sampled last cycle
    assert!(rig.core.alarms().is_active(AlarmKind::CoConcentrationTooHigh));

    rig.settle();
    co.step(&rig.core);
    assert!(!rig.core.alarms().is_active(AlarmKind::CoConcentrationTooHigh));

    assert_eq!(rig.sink.shown(AlarmKind::CoConcentrationTooHigh), 1);
    assert_eq!(rig.sink.cleared(AlarmKind::CoConcentrationTooHigh), 1);
}

#[test]
fn low_air_flow_raises_alarm() {
    let rig = Rig::new();
    rig.plant.set_air_flow(0.1);
    rig.core.hub().prime_all();
    rig.settle();

    let mut air = reader(&rig, ChannelId::AirFlow);
    air.step(&rig.core);

    assert!(rig.core.alarms().is_active(AlarmKind::AirFlowTooLow));
    assert!(!rig.core.alarms().is_active(AlarmKind::AirFlowSensorFault));
}

#[test]
fn ch4_at_limit_is_not_an_alarm() {
    let rig = Rig::new();
    rig.plant.set_ch4(1.0);
    rig.core.hub().prime_all();
    rig.settle();

    let mut ch4 = reader(&rig, ChannelId::Ch4);
    ch4.step(&rig.core);

    assert!(!rig.core.alarms().is_active(AlarmKind::Ch4ConcentrationTooHigh));
}

#[test]
fn readers_debounce_independently() {
    let rig = primed();
    let mut co = reader(&rig, ChannelId::Co);
    let mut ch4 = reader(&rig, ChannelId::Ch4);

    // CO glitches once while CH4 is healthy throughout.
    rig.core.inject_sensor_fault(ChannelId::Co);
    co.step(&rig.core);
    ch4.step(&rig.core);
    rig.settle();
    ch4.step(&rig.core);
    rig.core.clear_sensor_fault(ChannelId::Co);
    rig.settle();
    co.step(&rig.core);

    assert!(rig.core.alarms().is_empty());
}

#[test]
fn second_read_without_conversion_is_invalid() {
    let rig = primed();
    let adc = rig.core.hub().channel(ChannelId::Ch4);
    assert!(adc.read_value().is_ok());
    assert_eq!(adc.read_value(), Err(SensorError::DataNotReady));
}

#[test]
fn telemetry_line_reflects_published_readings() {
    let rig = Rig::new();
    rig.core.readings().publish(ChannelId::Co, 0.4);
    rig.core.readings().publish(ChannelId::WaterFlow, -3.0);

    let line = rig.core.telemetry().to_string();
    assert!(line.starts_with("CO: 0.40% | CH4: 0.00%"), "{line}");
    assert!(line.contains("WaterFlow: -3.00 cm/s"), "{line}");
    assert!(line.ends_with("waterLevel: 15.00 cm"), "{line}");
}

#[test]
fn control_surface_routes_operator_actions() {
    let rig = Rig::new();

    rig.core.request_manual_pump(true);
    assert_eq!(rig.core.pump_requests().manual_pending(), Some(PumpRequest::On));

    rig.core.set_pump_faulty(true);
    assert!(rig.plant.is_faulty());

    rig.core.inject_sensor_fault(ChannelId::AirFlow);
    assert!(rig.core.hub().channel(ChannelId::AirFlow).is_faulted());
    assert!(!rig.core.hub().channel(ChannelId::Co).is_faulted());
}
