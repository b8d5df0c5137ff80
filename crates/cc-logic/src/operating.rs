//! Operating-mode state machine.
//!
//! Transition table (commands on the left, automatic transitions below):
//!
//! | from                    | trigger            | to            | sequencer effect          |
//! |-------------------------|--------------------|---------------|---------------------------|
//! | OFF                     | start              | INIT          | start cool-down           |
//! | OFF, RUN                | warm-up            | WARMUP        | start warm-up             |
//! | RUN                     | hold               | HOLD          | hold                      |
//! | HOLD                    | resume             | RUN           | resume                    |
//! | any non-terminal        | stop               | OFF           | stop posture              |
//! | any non-terminal        | off                | OFF           | off posture (vents open)  |
//! | any non-terminal        | emergency stop     | SAFE_SHUTDOWN | safe-shutdown posture     |
//! | OFF, RUN                | refill on/off      | (unchanged)   | start/stop refill         |
//! | INIT                    | init timer elapsed | PRECOOL       |                           |
//! | PRECOOL                 | T5 <= target + band| RUN           |                           |
//! | WARMUP                  | T5 >= ambient - m  | OFF           | stop                      |
//! | any non-terminal        | critical verdict   | SAFE_SHUTDOWN | safe-shutdown posture     |
//! | SAFE_SHUTDOWN           | posture reached    | ALARM         |                           |
//! | ALARM                   | ack + latch clear  | OFF           | interlock reset           |
//!
//! SAFE_SHUTDOWN and ALARM accept only acknowledge. READY is never stored; it is a
//! display overlay over OFF, INIT, PRECOOL and RUN while the readiness predicate holds.

use cc_controls::{Posture, ProcedureKind, RefillCircuit, Sequencer};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{LogicError, LogicResult};
use crate::interlock::{InterlockEvaluator, InterlockVerdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatingState {
    #[default]
    Off,
    Init,
    Precool,
    Run,
    Hold,
    WarmUp,
    SafeShutdown,
    Alarm,
    Ready,
}

impl OperatingState {
    pub fn as_str(self) -> &'static str {
        match self {
            OperatingState::Off => "OFF",
            OperatingState::Init => "INIT",
            OperatingState::Precool => "PRECOOL",
            OperatingState::Run => "RUN",
            OperatingState::Hold => "HOLD",
            OperatingState::WarmUp => "WARMUP",
            OperatingState::SafeShutdown => "SAFE_SHUTDOWN",
            OperatingState::Alarm => "ALARM",
            OperatingState::Ready => "READY",
        }
    }

    /// SAFE_SHUTDOWN and ALARM: only an acknowledged, verified-safe recovery leaves them.
    pub fn is_terminal_safe(self) -> bool {
        matches!(self, OperatingState::SafeShutdown | OperatingState::Alarm)
    }

    /// States the READY overlay may cover.
    pub fn accepts_ready_overlay(self) -> bool {
        matches!(
            self,
            OperatingState::Off | OperatingState::Init | OperatingState::Precool | OperatingState::Run
        )
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    #[default]
    None,
    Start,
    Hold,
    Resume,
    WarmUp,
    Stop,
    Off,
    EmergencyStop,
    Acknowledge,
    RefillOn(RefillCircuit),
    RefillOff(RefillCircuit),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingParams {
    /// Time spent in INIT before PRECOOL (s).
    pub init_s: f64,
    /// Supply temperature the pre-cool aims for (K).
    pub precool_target_k: f64,
    /// PRECOOL hands over to RUN once T5 is within this band above the target (K).
    pub precool_band_k: f64,
    /// WARMUP ends once T5 is within this margin of ambient (K).
    pub warmup_off_margin_k: f64,
}

impl Default for OperatingParams {
    fn default() -> Self {
        Self {
            init_s: 2.0,
            precool_target_k: 80.0,
            precool_band_k: 5.0,
            warmup_off_margin_k: 1.0,
        }
    }
}

impl OperatingParams {
    pub fn validate(&self) -> LogicResult<()> {
        let non_negative = [
            (self.init_s, "init_s must be non-negative"),
            (self.precool_band_k, "precool_band_k must be non-negative"),
            (self.warmup_off_margin_k, "warmup_off_margin_k must be non-negative"),
        ];
        for (value, what) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(LogicError::InvalidArg { what });
            }
        }
        if !(self.precool_target_k.is_finite() && self.precool_target_k > 0.0) {
            return Err(LogicError::InvalidArg {
                what: "precool_target_k must be positive",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OperatingLogic {
    params: OperatingParams,
    state: OperatingState,
    init_left_s: f64,
    acknowledged: bool,
    /// Cool-down interrupted by a refill started from RUN.
    resume_cool_down: bool,
}

impl OperatingLogic {
    pub fn new(params: OperatingParams) -> LogicResult<Self> {
        params.validate()?;
        let init_left_s = params.init_s;
        Ok(Self {
            params,
            state: OperatingState::Off,
            init_left_s,
            acknowledged: false,
            resume_cool_down: false,
        })
    }

    pub fn params(&self) -> &OperatingParams {
        &self.params
    }

    /// The stored operating state (never READY).
    pub fn state(&self) -> OperatingState {
        self.state
    }

    /// Operating state with the READY overlay applied.
    pub fn display_state(&self, ready: bool) -> OperatingState {
        if ready && self.state.accepts_ready_overlay() {
            OperatingState::Ready
        } else {
            self.state
        }
    }

    /// Apply an operator command. Disallowed commands are logged and ignored.
    pub fn transition(
        &mut self,
        command: Command,
        seq: &mut Sequencer,
        interlock: &mut InterlockEvaluator,
    ) -> OperatingState {
        if command == Command::None {
            return self.state;
        }
        if self.state.is_terminal_safe() {
            if command == Command::Acknowledge {
                info!(state = %self.state, "acknowledged");
                self.acknowledged = true;
                interlock.acknowledge();
            } else {
                warn!(state = %self.state, ?command, "command rejected in terminal-safe state");
            }
            return self.state;
        }

        match (command, self.state) {
            (Command::Start, OperatingState::Off) => {
                seq.start(ProcedureKind::CoolDown);
                self.init_left_s = self.params.init_s;
                self.resume_cool_down = false;
                self.enter(OperatingState::Init);
            }
            (Command::WarmUp, OperatingState::Off | OperatingState::Run) => {
                seq.start(ProcedureKind::WarmUp);
                self.resume_cool_down = false;
                self.enter(OperatingState::WarmUp);
            }
            (Command::Hold, OperatingState::Run) => {
                seq.hold();
                self.enter(OperatingState::Hold);
            }
            (Command::Resume, OperatingState::Hold) => {
                seq.resume();
                self.enter(OperatingState::Run);
            }
            (Command::Stop, _) => {
                seq.request_baseline(Posture::Stop);
                self.resume_cool_down = false;
                self.enter(OperatingState::Off);
            }
            (Command::Off, _) => {
                seq.request_baseline(Posture::Off);
                self.resume_cool_down = false;
                self.enter(OperatingState::Off);
            }
            (Command::EmergencyStop, _) => {
                warn!(from = %self.state, "emergency stop");
                self.enter_safe_shutdown(seq);
            }
            (Command::Acknowledge, _) => interlock.acknowledge(),
            (Command::RefillOn(circuit), OperatingState::Off | OperatingState::Run) => {
                if self.state == OperatingState::Run && seq.procedure() == ProcedureKind::CoolDown {
                    self.resume_cool_down = true;
                }
                seq.start(circuit.procedure());
            }
            (Command::RefillOff(circuit), OperatingState::Off | OperatingState::Run) => {
                if seq.procedure() == circuit.procedure() {
                    seq.stop_refill(circuit);
                } else {
                    debug!(%circuit, "refill off ignored: refill not running");
                }
            }
            (command, state) => {
                debug!(?command, %state, "command not allowed in this state");
            }
        }
        self.state
    }

    /// Timed and verdict-driven transitions, run after the plant step.
    ///
    /// `supply_temp_k` is the supply temperature as observed by the interlock.
    pub fn update(
        &mut self,
        dt: f64,
        supply_temp_k: f64,
        seq: &mut Sequencer,
        interlock: &mut InterlockEvaluator,
        verdict: &InterlockVerdict,
    ) -> OperatingState {
        if verdict.forces_safe_shutdown() && !self.state.is_terminal_safe() {
            warn!(from = %self.state, "critical interlock verdict");
            self.enter_safe_shutdown(seq);
            return self.state;
        }

        match self.state {
            OperatingState::Init => {
                self.init_left_s -= dt.max(0.0);
                if self.init_left_s <= 0.0 {
                    self.enter(OperatingState::Precool);
                }
            }
            OperatingState::Precool => {
                if supply_temp_k <= self.params.precool_target_k + self.params.precool_band_k {
                    self.enter(OperatingState::Run);
                }
            }
            OperatingState::Run => {
                if self.resume_cool_down && seq.procedure().is_idle() {
                    self.resume_cool_down = false;
                    seq.start(ProcedureKind::CoolDown);
                }
            }
            OperatingState::WarmUp => {
                let ambient_k = seq.engine().params().ambient_k;
                if supply_temp_k >= ambient_k - self.params.warmup_off_margin_k {
                    seq.stop();
                    self.enter(OperatingState::Off);
                }
            }
            OperatingState::SafeShutdown => {
                let c = seq.controls();
                if !c.pump_running() && !c.press_ctrl_on && c.purge_open {
                    self.enter(OperatingState::Alarm);
                }
            }
            OperatingState::Alarm => {
                if self.acknowledged && !interlock.is_latched() {
                    interlock.reset();
                    self.acknowledged = false;
                    self.enter(OperatingState::Off);
                }
            }
            OperatingState::Off | OperatingState::Hold | OperatingState::Ready => {}
        }
        self.state
    }

    fn enter_safe_shutdown(&mut self, seq: &mut Sequencer) {
        seq.request_baseline(Posture::SafeShutdown);
        self.resume_cool_down = false;
        self.acknowledged = false;
        self.enter(OperatingState::SafeShutdown);
    }

    fn enter(&mut self, next: OperatingState) {
        if next != self.state {
            info!(from = %self.state, to = %next, "operating state");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interlock::InterlockLimits;
    use cc_controls::SequencerParams;
    use cc_sim::PhysicsEngine;

    fn parts() -> (OperatingLogic, Sequencer, InterlockEvaluator) {
        (
            OperatingLogic::new(OperatingParams::default()).unwrap(),
            Sequencer::new(PhysicsEngine::default(), SequencerParams::default()).unwrap(),
            InterlockEvaluator::new(InterlockLimits::default()).unwrap(),
        )
    }

    #[test]
    fn start_enters_init_and_starts_cool_down() {
        let (mut logic, mut seq, mut il) = parts();
        assert_eq!(logic.transition(Command::Start, &mut seq, &mut il), OperatingState::Init);
        assert_eq!(seq.procedure(), ProcedureKind::CoolDown);
    }

    #[test]
    fn init_timer_hands_over_to_precool() {
        let (mut logic, mut seq, mut il) = parts();
        logic.transition(Command::Start, &mut seq, &mut il);
        let verdict = InterlockVerdict::default();
        for _ in 0..19 {
            logic.update(0.1, 280.0, &mut seq, &mut il, &verdict);
        }
        assert_eq!(logic.state(), OperatingState::Init);
        logic.update(0.1, 280.0, &mut seq, &mut il, &verdict);
        logic.update(0.1, 280.0, &mut seq, &mut il, &verdict);
        assert_eq!(logic.state(), OperatingState::Precool);
        logic.update(0.1, 86.0, &mut seq, &mut il, &verdict);
        assert_eq!(logic.state(), OperatingState::Precool);
        logic.update(0.1, 85.0, &mut seq, &mut il, &verdict);
        assert_eq!(logic.state(), OperatingState::Run);
    }

    #[test]
    fn hold_only_from_run() {
        let (mut logic, mut seq, mut il) = parts();
        assert_eq!(logic.transition(Command::Hold, &mut seq, &mut il), OperatingState::Off);
        assert_eq!(logic.transition(Command::Resume, &mut seq, &mut il), OperatingState::Off);
    }

    #[test]
    fn terminal_safe_accepts_only_acknowledge() {
        let (mut logic, mut seq, mut il) = parts();
        logic.transition(Command::EmergencyStop, &mut seq, &mut il);
        assert_eq!(logic.state(), OperatingState::SafeShutdown);
        for command in [Command::Start, Command::Stop, Command::Off, Command::Resume] {
            assert_eq!(
                logic.transition(command, &mut seq, &mut il),
                OperatingState::SafeShutdown
            );
        }
        assert_eq!(seq.procedure(), ProcedureKind::Idle);
    }

    #[test]
    fn ready_overlay_scope() {
        let (logic, _, _) = parts();
        assert_eq!(logic.display_state(true), OperatingState::Ready);
        assert_eq!(logic.display_state(false), OperatingState::Off);
        assert!(!OperatingState::Hold.accepts_ready_overlay());
        assert!(!OperatingState::Alarm.accepts_ready_overlay());
    }

    #[test]
    fn negative_init_rejected() {
        let params = OperatingParams {
            init_s: -1.0,
            ..OperatingParams::default()
        };
        assert!(OperatingLogic::new(params).is_err());
    }
}
