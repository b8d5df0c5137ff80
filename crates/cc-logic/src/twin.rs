//! The twin facade: one call per tick runs the whole control flow.
//!
//! Per tick:
//! 1. operator command through the operating logic
//! 2. sequencer rules and plant step
//! 3. interlock evaluation on the observed readings
//! 4. timed and verdict-driven operating transitions

use cc_controls::{ManualCommands, ProcedureKind, Sequencer, SequencerParams};
use cc_sim::{Controls, PhysicsEngine, PlantParams, State};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LogicResult;
use crate::interlock::{InterlockEvaluator, InterlockLimits, Severity};
use crate::operating::{Command, OperatingLogic, OperatingParams, OperatingState};

/// Hook that rewrites the readings the interlock and the status see.
///
/// The plant itself is untouched; this is the extension point for sensor fault
/// injection.
pub trait StateOverride {
    fn apply(&mut self, state: &mut State);
}

impl<F> StateOverride for F
where
    F: FnMut(&mut State),
{
    fn apply(&mut self, state: &mut State) {
        self(state)
    }
}

/// Externally visible status of the twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinStatus {
    /// Operating state with the READY overlay applied.
    pub operating_state: OperatingState,
    pub active_procedure: ProcedureKind,
    pub readiness: bool,
    pub alarm_severity: Severity,
    pub latched: bool,
    /// Observed readings (after any override).
    pub state: State,
    pub controls: Controls,
}

pub struct CryoTwin {
    sequencer: Sequencer,
    logic: OperatingLogic,
    interlock: InterlockEvaluator,
    state_override: Option<Box<dyn StateOverride>>,
}

impl fmt::Debug for CryoTwin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryoTwin")
            .field("sequencer", &self.sequencer)
            .field("logic", &self.logic)
            .field("interlock", &self.interlock)
            .field("state_override", &self.state_override.is_some())
            .finish()
    }
}

impl CryoTwin {
    pub fn new(sequencer: Sequencer, logic: OperatingLogic, interlock: InterlockEvaluator) -> Self {
        Self {
            sequencer,
            logic,
            interlock,
            state_override: None,
        }
    }

    /// Build every part from its parameters and initial conditions.
    pub fn from_parts(
        plant: PlantParams,
        initial_state: State,
        initial_controls: Controls,
        sequencer: SequencerParams,
        limits: InterlockLimits,
        operating: OperatingParams,
    ) -> LogicResult<Self> {
        let engine = PhysicsEngine::new(plant, initial_state, initial_controls)?;
        let sequencer = Sequencer::new(engine, sequencer)?;
        let logic = OperatingLogic::new(operating)?;
        let interlock = InterlockEvaluator::new(limits)?;
        Ok(Self::new(sequencer, logic, interlock))
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn logic(&self) -> &OperatingLogic {
        &self.logic
    }

    pub fn interlock(&self) -> &InterlockEvaluator {
        &self.interlock
    }

    /// Stored operating state (never READY).
    pub fn operating_state(&self) -> OperatingState {
        self.logic.state()
    }

    pub fn set_state_override(&mut self, hook: Box<dyn StateOverride>) {
        self.state_override = Some(hook);
    }

    pub fn clear_state_override(&mut self) {
        self.state_override = None;
    }

    pub fn set_heat_load(&mut self, watts: f64) {
        self.sequencer.set_heat_load(watts);
    }

    pub fn set_pressure_setpoint(&mut self, bar: f64) {
        self.sequencer.set_pressure_setpoint(bar);
    }

    /// Manual actuator values; ignored while a procedure is active.
    pub fn apply_manual_commands(&mut self, desired: &ManualCommands) -> bool {
        self.sequencer.apply_manual_commands(desired)
    }

    /// Full per-tick control flow.
    pub fn tick(&mut self, dt: f64, command: Command) -> TwinStatus {
        self.transition(command);
        self.update(dt);
        self.snapshot_status()
    }

    pub fn transition(&mut self, command: Command) -> OperatingState {
        self.logic
            .transition(command, &mut self.sequencer, &mut self.interlock)
    }

    /// Sequencer and plant, interlock, then automatic operating transitions.
    pub fn update(&mut self, dt: f64) -> OperatingState {
        self.sequencer.update(dt);
        let observed = self.observed_state();
        let verdict = self
            .interlock
            .evaluate(&observed, self.sequencer.controls(), dt)
            .clone();
        self.logic.update(
            dt,
            observed.supply_temp_k,
            &mut self.sequencer,
            &mut self.interlock,
            &verdict,
        )
    }

    /// Plant readings after the override hook.
    ///
    /// Takes `&mut self` because the hook may keep state between calls.
    pub fn observed_state(&mut self) -> State {
        let mut state = self.sequencer.state().clone();
        if let Some(hook) = self.state_override.as_mut() {
            hook.apply(&mut state);
        }
        state
    }

    pub fn snapshot_status(&mut self) -> TwinStatus {
        let state = self.observed_state();
        let ready = self.sequencer.is_ready();
        TwinStatus {
            operating_state: self.logic.display_state(ready),
            active_procedure: self.sequencer.procedure(),
            readiness: ready,
            alarm_severity: self.interlock.severity(),
            latched: self.interlock.is_latched(),
            state,
            controls: self.sequencer.controls().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn starts_off_and_idle() {
        let mut twin = twin();
        let status = twin.tick(0.1, Command::None);
        assert_eq!(status.operating_state, OperatingState::Off);
        assert_eq!(status.active_procedure, ProcedureKind::Idle);
        assert_eq!(status.alarm_severity, Severity::Normal);
    }

    #[test]
    fn override_feeds_status_not_plant() {
        let mut twin = twin();
        twin.set_state_override(Box::new(|s: &mut State| s.hv_level_pct = 12.0));
        let status = twin.tick(0.1, Command::None);
        assert_eq!(status.state.hv_level_pct, 12.0);
        assert!(twin.sequencer().state().hv_level_pct > 20.0);
        twin.clear_state_override();
        let status = twin.tick(0.1, Command::None);
        assert!(status.state.hv_level_pct > 20.0);
    }
}
