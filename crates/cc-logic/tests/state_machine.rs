//! Integration tests: operating state machine driven through the twin facade.

use cc_controls::{ProcedureKind, RefillCircuit, SequencerParams};
use cc_logic::{
    Command, CryoTwin, InterlockLimits, OperatingParams, OperatingState, Severity, TwinStatus,
};
use cc_sim::{Controls, PlantParams, State};
use proptest::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

fn twin() -> CryoTwin {
    CryoTwin::from_parts(
        PlantParams::default(),
        State::default(),
        Controls::default(),
        SequencerParams::default(),
        InterlockLimits::default(),
        OperatingParams::default(),
    )
    .unwrap()
}

/// Twin whose observed return temperature reads 320 K while the flag is set.
fn twin_with_hot_sensor() -> (CryoTwin, Rc<Cell<bool>>) {
    let mut twin = twin();
    let hot = Rc::new(Cell::new(false));
    let flag = Rc::clone(&hot);
    twin.set_state_override(Box::new(move |s: &mut State| {
        if flag.get() {
            s.return_temp_k = 320.0;
        }
    }));
    (twin, hot)
}

fn tick_until(
    twin: &mut CryoTwin,
    dt: f64,
    max_ticks: usize,
    mut done: impl FnMut(&TwinStatus) -> bool,
) -> Option<TwinStatus> {
    for _ in 0..max_ticks {
        let status = twin.tick(dt, Command::None);
        if done(&status) {
            return Some(status);
        }
    }
    None
}

fn run_to_run_state(twin: &mut CryoTwin) {
    twin.tick(0.1, Command::Start);
    assert_eq!(twin.operating_state(), OperatingState::Init);
    let mut ticks = 0;
    while twin.operating_state() != OperatingState::Run {
        twin.tick(0.1, Command::None);
        ticks += 1;
        assert!(ticks < 9000, "never reached RUN");
    }
}

#[test]
fn start_walks_init_precool_run() {
    let mut twin = twin();
    let status = twin.tick(0.1, Command::Start);
    assert_eq!(status.active_procedure, ProcedureKind::CoolDown);
    assert_eq!(twin.operating_state(), OperatingState::Init);

    let mut seen_precool = false;
    for _ in 0..9000 {
        twin.tick(0.1, Command::None);
        match twin.operating_state() {
            OperatingState::Precool => seen_precool = true,
            OperatingState::Run => break,
            OperatingState::Init => {}
            other => panic!("unexpected state {other}"),
        }
    }
    assert!(seen_precool);
    assert_eq!(twin.operating_state(), OperatingState::Run);
    assert!(twin.sequencer().state().supply_temp_k <= 85.0);
}

#[test]
fn hold_resume_and_warm_up_back_to_off() {
    let mut twin = twin();
    run_to_run_state(&mut twin);

    twin.tick(0.1, Command::Hold);
    assert_eq!(twin.operating_state(), OperatingState::Hold);
    assert!(twin.sequencer().is_held());
    twin.tick(0.1, Command::Resume);
    assert_eq!(twin.operating_state(), OperatingState::Run);
    assert!(!twin.sequencer().is_held());

    let status = twin.tick(0.5, Command::WarmUp);
    assert_eq!(twin.operating_state(), OperatingState::WarmUp);
    assert_eq!(status.active_procedure, ProcedureKind::WarmUp);

    let ambient = twin.sequencer().engine().params().ambient_k;
    let mut ticks = 0;
    while twin.operating_state() == OperatingState::WarmUp {
        twin.tick(0.5, Command::None);
        ticks += 1;
        assert!(ticks < 10_000, "warm-up never finished");
    }
    assert_eq!(twin.operating_state(), OperatingState::Off);
    assert!(twin.sequencer().state().supply_temp_k >= ambient - 1.0);
    assert_eq!(twin.sequencer().procedure(), ProcedureKind::Idle);
}

#[test]
fn critical_forces_safe_shutdown_then_alarm_then_off_after_ack() {
    let (mut twin, hot) = twin_with_hot_sensor();
    twin.tick(0.1, Command::Start);

    hot.set(true);
    let status = twin.tick(0.1, Command::None);
    assert_eq!(status.operating_state, OperatingState::SafeShutdown);
    assert_eq!(status.alarm_severity, Severity::Critical);
    assert_eq!(status.active_procedure, ProcedureKind::Idle);

    let status = twin.tick(0.1, Command::None);
    assert_eq!(status.operating_state, OperatingState::Alarm);
    assert!(status.controls.purge_open);
    assert_eq!(status.controls.pump_hz, 0.0);
    assert!(!status.controls.press_ctrl_on);

    // Only acknowledge is accepted; the latch holds while the condition persists.
    twin.tick(0.1, Command::Start);
    assert_eq!(twin.operating_state(), OperatingState::Alarm);
    twin.tick(0.1, Command::Acknowledge);
    for _ in 0..5 {
        twin.tick(0.1, Command::None);
    }
    assert_eq!(twin.operating_state(), OperatingState::Alarm);
    assert!(twin.interlock().is_latched());

    hot.set(false);
    let status = twin.tick(0.1, Command::None);
    assert_eq!(status.operating_state, OperatingState::Alarm);
    let status = twin.tick(0.1, Command::None);
    assert_eq!(status.operating_state, OperatingState::Off);
    assert!(!status.latched);

    let status = twin.tick(0.1, Command::None);
    assert_eq!(status.alarm_severity, Severity::Normal);
}

#[test]
fn alarm_requires_acknowledge() {
    let (mut twin, hot) = twin_with_hot_sensor();
    hot.set(true);
    twin.tick(0.1, Command::None);
    twin.tick(0.1, Command::None);
    assert_eq!(twin.operating_state(), OperatingState::Alarm);

    hot.set(false);
    for _ in 0..20 {
        twin.tick(0.1, Command::None);
    }
    assert_eq!(twin.operating_state(), OperatingState::Alarm);

    twin.tick(0.1, Command::Acknowledge);
    twin.tick(0.1, Command::None);
    assert_eq!(twin.operating_state(), OperatingState::Off);
}

#[test]
fn emergency_stop_from_run() {
    let mut twin = twin();
    twin.tick(0.1, Command::Start);
    assert_eq!(
        twin.transition(Command::EmergencyStop),
        OperatingState::SafeShutdown
    );
    // The posture is applied by the same update, so ALARM follows at once.
    assert_eq!(twin.update(0.1), OperatingState::Alarm);
    assert!(twin.sequencer().controls().purge_open);

    // Nothing latched: a single acknowledge recovers.
    let status = twin.tick(0.1, Command::Acknowledge);
    assert_eq!(status.operating_state, OperatingState::Off);
}

#[test]
fn stop_and_off_postures() {
    let mut twin = twin();
    twin.tick(0.1, Command::Start);
    let status = twin.tick(0.1, Command::Stop);
    assert_eq!(status.operating_state, OperatingState::Off);
    assert_eq!(status.active_procedure, ProcedureKind::Idle);
    assert_eq!(status.controls.pump_hz, 0.0);
    assert!(!status.controls.supply_open);
    assert_eq!(status.controls.loop_vent, 0.0);

    let status = twin.tick(0.1, Command::Off);
    assert_eq!(status.operating_state, OperatingState::Off);
    assert_eq!(status.controls.loop_vent, 1.0);
    assert_eq!(status.controls.hv_vent, 1.0);
}

#[test]
fn refill_from_run_resumes_cool_down() {
    let mut twin = twin();
    run_to_run_state(&mut twin);

    let status = twin.tick(0.1, Command::RefillOn(RefillCircuit::HeaterVessel));
    assert_eq!(status.active_procedure, ProcedureKind::RefillHv);
    assert_eq!(twin.operating_state(), OperatingState::Run);

    let status = tick_until(&mut twin, 0.1, 8000, |s| {
        s.active_procedure == ProcedureKind::CoolDown
    });
    assert!(status.is_some(), "cool-down never resumed");
    assert_eq!(twin.operating_state(), OperatingState::Run);
    assert!(twin.sequencer().state().hv_level_pct >= 89.0);
}

#[test]
fn refill_commands_ignored_outside_off_and_run() {
    let mut starting = twin();
    starting.tick(0.1, Command::Start);
    let status = starting.tick(0.1, Command::RefillOn(RefillCircuit::Subcooler));
    assert_eq!(status.active_procedure, ProcedureKind::CoolDown);

    let mut idle = twin();
    let status = idle.tick(0.1, Command::RefillOn(RefillCircuit::Subcooler));
    assert_eq!(status.active_procedure, ProcedureKind::RefillSubcooler);
    assert_eq!(idle.operating_state(), OperatingState::Off);
    assert!(status.controls.sub_refill_open);
    let status = idle.tick(0.1, Command::RefillOff(RefillCircuit::Subcooler));
    assert_eq!(status.active_procedure, ProcedureKind::Idle);
    assert!(!status.controls.sub_refill_open);
}

#[test]
fn refill_off_closes_heater_vessel_circuit() {
    let mut twin = twin();
    twin.tick(0.1, Command::RefillOn(RefillCircuit::HeaterVessel));
    for _ in 0..20 {
        twin.tick(0.1, Command::None);
    }
    assert!(twin.sequencer().controls().hv_refill_open);

    let status = twin.tick(0.1, Command::RefillOff(RefillCircuit::HeaterVessel));
    assert_eq!(status.active_procedure, ProcedureKind::Idle);
    assert!(!status.controls.hv_refill_open);
    assert_eq!(status.controls.hv_vent, 0.0);
    assert!(status.controls.press_ctrl_on);

    let level_at_off = status.state.hv_level_pct;
    for _ in 0..3000 {
        twin.tick(0.1, Command::None);
    }
    assert!(!twin.sequencer().controls().hv_refill_open);
    assert!(twin.sequencer().state().hv_level_pct <= level_at_off);
}

fn any_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::None),
        Just(Command::Start),
        Just(Command::Hold),
        Just(Command::Resume),
        Just(Command::WarmUp),
        Just(Command::Stop),
        Just(Command::Off),
        Just(Command::EmergencyStop),
        Just(Command::Acknowledge),
        Just(Command::RefillOn(RefillCircuit::HeaterVessel)),
        Just(Command::RefillOff(RefillCircuit::HeaterVessel)),
        Just(Command::RefillOn(RefillCircuit::Subcooler)),
    ]
}

proptest! {
    #[test]
    fn safety_holds_for_any_command_sequence(
        steps in prop::collection::vec((any_command(), any::<bool>()), 1..80)
    ) {
        let (mut twin, hot) = twin_with_hot_sensor();
        for (command, critical) in steps {
            let before = twin.operating_state();
            hot.set(critical);
            let status = twin.tick(0.5, command);
            let after = twin.operating_state();

            if critical {
                prop_assert!(after.is_terminal_safe(), "{} -> {} under critical", before, after);
                prop_assert_eq!(status.alarm_severity, Severity::Critical);
            }
            if before == OperatingState::SafeShutdown {
                prop_assert!(after.is_terminal_safe());
            }
            if before == OperatingState::Alarm {
                prop_assert!(matches!(after, OperatingState::Alarm | OperatingState::Off));
            }
            prop_assert!(after != OperatingState::Ready);
        }
    }
}
