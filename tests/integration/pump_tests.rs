//! Pump controller arbitration and flow-consistency monitoring.

use std::sync::Arc;

use minewatch::app::ports::WaterLevelListener;
use minewatch::control::alarms::AlarmKind;
use minewatch::control::pump::{FlowMonitor, PumpController};
use minewatch::drivers::pump::{PumpDriver, PumpReason};
use minewatch::events::PumpRequest;
use minewatch::sensors::ChannelId;

use crate::mock_hw::Rig;

fn controller(rig: &Rig) -> (PumpController, Arc<PumpDriver>) {
    let driver = Arc::new(PumpDriver::new(rig.core.plant(), rig.core.sink()));
    (PumpController::new(Arc::clone(&driver)), driver)
}

fn set_ch4(rig: &Rig, value: f32) {
    rig.core.readings().publish(ChannelId::Ch4, value);
}

// ── Controller ────────────────────────────────────────────────

#[test]
fn ch4_interlock_overrides_pending_requests() {
    let rig = Rig::new();
    let (mut ctrl, pump) = controller(&rig);
    pump.turn_on(PumpReason::Operator);

    set_ch4(&rig, 1.5);
    rig.core.request_manual_pump(true);
    rig.core.pump_requests().on_water_level_high();
    ctrl.step(&rig.core);

    assert!(!pump.is_on());
    assert_eq!(rig.sink.logs_containing("PUMP OFF - CH4 CONCENTRATION TOO HIGH"), 1);
    // Requests survive the interlock cycle untouched.
    assert_eq!(rig.core.pump_requests().manual_pending(), Some(PumpRequest::On));
    assert!(rig.core.pump_requests().level_high_pending());

    // While CH4 stays high nothing else happens.
    ctrl.step(&rig.core);
    assert!(!pump.is_on());
    assert_eq!(rig.sink.logs_containing("CH4 CONCENTRATION TOO HIGH"), 1);

    set_ch4(&rig, 0.1);
    ctrl.step(&rig.core);
    assert!(pump.is_on());
    assert_eq!(rig.core.pump_requests().manual_pending(), None);
    assert!(!rig.core.pump_requests().level_high_pending());
}

#[test]
fn interlock_does_not_propagate_to_plant() {
    let rig = Rig::new();
    let (mut ctrl, _) = controller(&rig);
    set_ch4(&rig, 2.0);
    ctrl.step(&rig.core);
    assert_eq!(rig.plant.on_calls() + rig.plant.off_calls(), 0);
}

#[test]
fn level_high_edge_turns_pump_on_exactly_once() {
    let rig = Rig::new();
    let (mut ctrl, pump) = controller(&rig);

    rig.core.pump_requests().on_water_level_high();
    for _ in 0..10 {
        ctrl.step(&rig.core);
    }

    assert!(pump.is_on());
    assert_eq!(rig.sink.logs_containing("PUMP ON - WATER LEVEL HIGH"), 1);
    assert_eq!(rig.sink.pump_indicator_updates(), vec![true]);
}

#[test]
fn level_high_while_running_is_consumed_silently() {
    let rig = Rig::new();
    let (mut ctrl, pump) = controller(&rig);
    pump.turn_on(PumpReason::Operator);

    rig.core.pump_requests().on_water_level_high();
    ctrl.step(&rig.core);

    assert!(!rig.core.pump_requests().level_high_pending());
    assert_eq!(rig.sink.logs_containing("WATER LEVEL HIGH"), 0);
}

#[test]
fn level_low_only_stops_a_running_pump() {
    let rig = Rig::new();
    let (mut ctrl, pump) = controller(&rig);

    rig.core.pump_requests().on_water_level_low();
    ctrl.step(&rig.core);
    assert_eq!(rig.sink.logs_containing("WATER LEVEL LOW"), 0);

    pump.turn_on(PumpReason::Operator);
    rig.core.pump_requests().on_water_level_low();
    ctrl.step(&rig.core);
    assert!(!pump.is_on());
    assert_eq!(rig.sink.logs_containing("PUMP OFF - WATER LEVEL LOW"), 1);
}

#[test]
fn manual_request_acts_even_without_state_change() {
    let rig = Rig::new();
    let (mut ctrl, pump) = controller(&rig);

    rig.core.request_manual_pump(false);
    ctrl.step(&rig.core);

    assert!(!pump.is_on());
    assert_eq!(rig.sink.logs_containing("PUMP OFF - OPERATOR SIGNAL"), 1);
    assert!(rig.sink.pump_indicator_updates().is_empty());
}

#[test]
fn manual_on_then_level_low_in_same_cycle() {
    let rig = Rig::new();
    let (mut ctrl, pump) = controller(&rig);

    rig.core.request_manual_pump(true);
    rig.core.pump_requests().on_water_level_low();
    ctrl.step(&rig.core);

    // Manual is handled first, then level-low stops the pump again.
    assert!(!pump.is_on());
    assert_eq!(rig.sink.pump_indicator_updates(), vec![true, false]);
}

#[test]
fn commanded_state_is_propagated_every_cycle() {
    let rig = Rig::new();
    let (mut ctrl, _) = controller(&rig);

    ctrl.step(&rig.core);
    ctrl.step(&rig.core);
    assert_eq!(rig.plant.off_calls(), 2);

    rig.core.request_manual_pump(true);
    ctrl.step(&rig.core);
    assert_eq!(rig.plant.on_calls(), 1);
}

// ── Flow monitor ──────────────────────────────────────────────

fn monitor(rig: &Rig, pump: &PumpDriver) -> FlowMonitor {
    FlowMonitor::new(pump.commanded(), rig.core.config().flow_anomaly_persistence)
}

#[test]
fn outflow_while_off_alarms_on_ninth_cycle() {
    let rig = Rig::new();
    let (_, pump) = controller(&rig);
    let mut mon = monitor(&rig, &pump);
    rig.core.readings().publish(ChannelId::WaterFlow, -3.0);

    for _ in 0..8 {
        mon.step(&rig.core);
    }
    assert!(!rig.core.alarms().is_active(AlarmKind::PumpOffFlow));

    mon.step(&rig.core);
    assert!(rig.core.alarms().is_active(AlarmKind::PumpOffFlow));

    for _ in 0..5 {
        mon.step(&rig.core);
    }
    assert_eq!(rig.sink.shown(AlarmKind::PumpOffFlow), 1);
}

#[test]
fn no_flow_while_on_alarms_and_recovers() {
    let rig = Rig::new();
    let (_, pump) = controller(&rig);
    let mut mon = monitor(&rig, &pump);
    pump.turn_on(PumpReason::Operator);
    rig.core.readings().publish(ChannelId::WaterFlow, 0.0);

    for _ in 0..9 {
        mon.step(&rig.core);
    }
    assert!(rig.core.alarms().is_active(AlarmKind::PumpOnNoFlow));

    rig.core.readings().publish(ChannelId::WaterFlow, -3.0);
    mon.step(&rig.core);
    assert!(!rig.core.alarms().is_active(AlarmKind::PumpOnNoFlow));
    assert_eq!(mon.anomaly_count(), 0);
    assert_eq!(rig.sink.cleared(AlarmKind::PumpOnNoFlow), 1);
}

#[test]
fn interrupted_anomaly_run_does_not_alarm() {
    let rig = Rig::new();
    let (_, pump) = controller(&rig);
    let mut mon = monitor(&rig, &pump);

    for _ in 0..3 {
        rig.core.readings().publish(ChannelId::WaterFlow, -3.0);
        for _ in 0..8 {
            mon.step(&rig.core);
        }
        rig.core.readings().publish(ChannelId::WaterFlow, 0.0);
        mon.step(&rig.core);
    }

    assert!(rig.core.alarms().is_empty());
}
