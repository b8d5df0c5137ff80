//! Rule-based actuator sequencer.
//!
//! The sequencer is the only owner of the plant's actuator outputs. Every tick it runs
//! one rule per actuator in [`RULE_ORDER`]; a rule reads the previous readings, the
//! active procedure and the outputs already decided this tick, and returns the value
//! for its own actuator. The dispatcher is the only place that writes the outputs.
//! The plant is stepped once the full actuator set is known.

use crate::error::ControlResult;
use crate::hysteresis::RefillHysteresis;
use crate::manual::{ManualCommands, Posture};
use crate::params::SequencerParams;
use crate::procedure::{ProcedureKind, RefillCircuit};
use crate::pulse::PulseTimer;
use cc_core::units::{Power, watts};
use cc_core::clamp_non_negative;
use cc_sim::{Controls, PhysicsEngine, State};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Actuator groups, each owned by exactly one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actuator {
    /// Pump frequency and V10 throttle.
    Baseline,
    Supply,
    Return,
    LoopVent,
    PulseVent,
    HvRefill,
    SubRefill,
    Purge,
    PressureControl,
}

const RULE_ORDER: [Actuator; 9] = [
    Actuator::Baseline,
    Actuator::Supply,
    Actuator::Return,
    Actuator::LoopVent,
    Actuator::PulseVent,
    Actuator::HvRefill,
    Actuator::SubRefill,
    Actuator::Purge,
    Actuator::PressureControl,
];

/// Facts shared by every rule of one pass.
struct RulePass<'a> {
    dt: f64,
    state: &'a State,
    prev: &'a Controls,
    hv_demand: bool,
    sub_demand: bool,
    warmup_done: bool,
}

/// Sequencer snapshot for displays and the operating logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerStatus {
    pub procedure: ProcedureKind,
    pub held: bool,
    pub ready: bool,
    pub heat_load_w: f64,
    pub hv_refill: RefillHysteresis,
    pub sub_refill: RefillHysteresis,
    pub state: State,
    pub controls: Controls,
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    engine: PhysicsEngine,
    params: SequencerParams,
    procedure: ProcedureKind,
    /// Procedure seen by the previous tick, for edge detection.
    previous: ProcedureKind,
    held: bool,
    manual: ManualCommands,
    hv_refill: RefillHysteresis,
    sub_refill: RefillHysteresis,
    pulse: PulseTimer,
    purge_latched: bool,
    heat_load_w: f64,
    ready: bool,
}

impl Sequencer {
    pub fn new(engine: PhysicsEngine, params: SequencerParams) -> ControlResult<Self> {
        params.validate()?;
        let pulse = PulseTimer::new(params.pulse_period_s);
        Ok(Self {
            engine,
            params,
            procedure: ProcedureKind::Idle,
            previous: ProcedureKind::Idle,
            held: false,
            manual: ManualCommands::default(),
            hv_refill: RefillHysteresis::new(),
            sub_refill: RefillHysteresis::new(),
            pulse,
            purge_latched: false,
            heat_load_w: 0.0,
            ready: false,
        })
    }

    pub fn engine(&self) -> &PhysicsEngine {
        &self.engine
    }

    pub fn state(&self) -> &State {
        self.engine.state()
    }

    pub fn controls(&self) -> &Controls {
        self.engine.controls()
    }

    pub fn params(&self) -> &SequencerParams {
        &self.params
    }

    pub fn procedure(&self) -> ProcedureKind {
        self.procedure
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn heat_load_w(&self) -> f64 {
        self.heat_load_w
    }

    pub fn heat_load(&self) -> Power {
        watts(self.heat_load_w)
    }

    pub fn manual(&self) -> &ManualCommands {
        &self.manual
    }

    pub fn hv_refill(&self) -> &RefillHysteresis {
        &self.hv_refill
    }

    pub fn sub_refill(&self) -> &RefillHysteresis {
        &self.sub_refill
    }

    pub fn pulse(&self) -> &PulseTimer {
        &self.pulse
    }

    /// Begin an automatic procedure, replacing whatever was running.
    ///
    /// Manual overrides are dropped; starting `Idle` is the same as [`Sequencer::stop`].
    pub fn start(&mut self, kind: ProcedureKind) {
        if kind.is_idle() {
            self.stop();
            return;
        }
        info!(from = %self.procedure, to = %kind, "starting procedure");
        self.procedure = kind;
        self.held = false;
        self.manual = ManualCommands::default();
    }

    /// Abort the active procedure. Actuators stay where they are, except that a vent
    /// held open by the pulse closes on the next tick.
    pub fn stop(&mut self) {
        if !self.procedure.is_idle() {
            info!(procedure = %self.procedure, "stopping procedure");
        }
        self.procedure = ProcedureKind::Idle;
        // A later start of the same procedure is a fresh entry.
        self.previous = ProcedureKind::Idle;
        self.held = false;
    }

    /// Abort a refill and queue overrides that close its circuit on the next tick.
    pub fn stop_refill(&mut self, circuit: RefillCircuit) {
        self.stop();
        debug!(%circuit, "closing refill circuit");
        self.manual.merge(&ManualCommands::refill_off(circuit));
    }

    /// Freeze rule progression. The plant keeps stepping.
    pub fn hold(&mut self) {
        if self.procedure.is_idle() {
            debug!("hold ignored: no procedure active");
            return;
        }
        debug!(procedure = %self.procedure, "holding");
        self.held = true;
    }

    pub fn resume(&mut self) {
        if self.held {
            debug!(procedure = %self.procedure, "resuming");
        }
        self.held = false;
    }

    /// Queue manual actuator values. Returns `false` (and changes nothing) while a
    /// procedure is active.
    pub fn apply_manual_commands(&mut self, desired: &ManualCommands) -> bool {
        if !self.procedure.is_idle() {
            debug!(procedure = %self.procedure, "manual command ignored while procedure active");
            return false;
        }
        self.manual.merge(desired);
        true
    }

    /// Stop and queue a safe posture as manual overrides.
    pub fn request_baseline(&mut self, posture: Posture) {
        self.stop();
        debug!(?posture, "baseline posture requested");
        self.manual = ManualCommands::posture(posture);
    }

    /// Heater-vessel pressure setpoint (bar), clamped to the relief limit.
    pub fn set_pressure_setpoint(&mut self, bar: f64) {
        if !bar.is_finite() {
            debug!(bar, "ignoring non-finite pressure setpoint");
            return;
        }
        let controls = Controls {
            press_sp_bar: bar,
            ..self.engine.controls().clone()
        };
        self.engine.set_controls(controls);
    }

    /// External heat load on the crystal (W). Negative or non-finite reads as zero.
    pub fn set_heat_load(&mut self, load_w: f64) {
        self.heat_load_w = if load_w.is_finite() {
            clamp_non_negative(load_w)
        } else {
            0.0
        };
    }

    /// Replace the plant readings, e.g. to restore a saved state.
    pub fn reset_state(&mut self, state: State) {
        self.engine.set_state(state);
    }

    /// Run the rules (unless held), step the plant, and refresh readiness.
    pub fn update(&mut self, dt: f64) -> &State {
        if !(dt.is_finite() && dt > 0.0) {
            debug!(dt, "skipping sequencer update with invalid dt");
            return self.engine.state();
        }
        self.detect_edge();
        if !self.held {
            self.run_rules(dt);
        }
        self.engine.step(dt, self.heat_load_w);
        self.ready = self
            .params
            .readiness
            .is_ready(self.engine.state(), self.engine.controls());
        let progress = self.procedure.progress(self.held);
        self.engine.annotate(self.ready, progress);
        self.engine.state()
    }

    pub fn snapshot_status(&self) -> SequencerStatus {
        SequencerStatus {
            procedure: self.procedure,
            held: self.held,
            ready: self.ready,
            heat_load_w: self.heat_load_w,
            hv_refill: self.hv_refill,
            sub_refill: self.sub_refill,
            state: self.engine.state().clone(),
            controls: self.engine.controls().clone(),
        }
    }

    fn detect_edge(&mut self) {
        if self.procedure == self.previous {
            return;
        }
        debug!(from = %self.previous, to = %self.procedure, "procedure edge");
        match self.procedure {
            ProcedureKind::CoolDown => {
                self.hv_refill.reset();
                self.sub_refill.reset();
            }
            ProcedureKind::WarmUp => self.purge_latched = false,
            ProcedureKind::RefillHv => self.hv_refill.force_armed(),
            ProcedureKind::RefillSubcooler => self.sub_refill.force_armed(),
            ProcedureKind::Idle => {}
        }
        self.previous = self.procedure;
    }

    fn run_rules(&mut self, dt: f64) {
        let state = self.engine.state().clone();
        let prev = self.engine.controls().clone();
        let kind = self.procedure;

        let hv_demand = kind.allows_hv_refill()
            && self
                .hv_refill
                .demand(state.hv_level_pct, &self.params.hv_refill);
        let sub_demand = kind.allows_sub_refill()
            && self
                .sub_refill
                .demand(state.sub_level_pct, &self.params.sub_refill);
        let ambient_k = self.engine.params().ambient_k;
        let warmup_done = kind == ProcedureKind::WarmUp
            && state.return_temp_k >= ambient_k - self.params.warmup_done_margin_k;

        let pass = RulePass {
            dt,
            state: &state,
            prev: &prev,
            hv_demand,
            sub_demand,
            warmup_done,
        };

        let mut next = prev.clone();
        for actuator in RULE_ORDER {
            match actuator {
                Actuator::Baseline => {
                    let (pump_hz, throttle) = self.baseline_rule(&pass);
                    next.pump_hz = pump_hz;
                    next.throttle = throttle;
                }
                Actuator::Supply => next.supply_open = self.supply_rule(&pass),
                Actuator::Return => next.return_open = self.return_rule(&pass, &next),
                Actuator::LoopVent => next.loop_vent = self.loop_vent_rule(&pass),
                Actuator::PulseVent => next.hv_vent = self.pulse_rule(&pass),
                Actuator::HvRefill => next.hv_refill_open = self.hv_refill_rule(&pass, &next),
                Actuator::SubRefill => next.sub_refill_open = self.sub_refill_rule(&pass),
                Actuator::Purge => next.purge_open = self.purge_rule(&pass),
                Actuator::PressureControl => {
                    next.press_ctrl_on = self.pressure_control_rule(&pass, &next)
                }
            }
        }
        self.engine.set_controls(next);
        self.check_completion(&pass);
    }

    fn baseline_rule(&self, pass: &RulePass) -> (f64, f64) {
        let p = &self.params;
        let prev = pass.prev;
        match self.procedure {
            ProcedureKind::CoolDown => (
                prev.pump_hz.max(p.cooldown_pump_min_hz),
                p.cooldown_throttle,
            ),
            ProcedureKind::WarmUp => (prev.pump_hz.max(p.warmup_pump_min_hz), p.warmup_throttle),
            ProcedureKind::RefillHv | ProcedureKind::RefillSubcooler => {
                (prev.pump_hz, prev.throttle)
            }
            ProcedureKind::Idle => (
                self.manual.pump_hz.unwrap_or(prev.pump_hz),
                self.manual.throttle.unwrap_or(prev.throttle),
            ),
        }
    }

    fn supply_rule(&self, pass: &RulePass) -> bool {
        match self.procedure {
            ProcedureKind::CoolDown => true,
            ProcedureKind::WarmUp => false,
            ProcedureKind::RefillHv | ProcedureKind::RefillSubcooler => pass.prev.supply_open,
            ProcedureKind::Idle => self.manual.supply_open.unwrap_or(pass.prev.supply_open),
        }
    }

    fn return_rule(&self, pass: &RulePass, next: &Controls) -> bool {
        match self.procedure {
            // Latches open once the loop is cold enough to close.
            ProcedureKind::CoolDown => {
                next.supply_open
                    && (pass.prev.return_open
                        || pass.state.return_temp_k < self.params.loop_close_k)
            }
            ProcedureKind::WarmUp => false,
            ProcedureKind::RefillHv | ProcedureKind::RefillSubcooler => pass.prev.return_open,
            ProcedureKind::Idle => self.manual.return_open.unwrap_or(pass.prev.return_open),
        }
    }

    fn loop_vent_rule(&self, pass: &RulePass) -> f64 {
        let p = &self.params;
        match self.procedure {
            ProcedureKind::CoolDown => {
                let t6 = pass.state.return_temp_k;
                let staged = if t6 >= p.loop_close_k {
                    p.vent_full_opening
                } else if t6 >= p.vent_mid_above_k {
                    p.vent_mid_opening
                } else {
                    0.0
                };
                if pass.hv_demand {
                    staged.max(p.vent_hv_refill_min)
                } else {
                    staged
                }
            }
            ProcedureKind::WarmUp => {
                if pass.warmup_done {
                    0.0
                } else {
                    p.warmup_vent_opening
                }
            }
            ProcedureKind::RefillHv | ProcedureKind::RefillSubcooler => pass.prev.loop_vent,
            ProcedureKind::Idle => self.manual.loop_vent.unwrap_or(pass.prev.loop_vent),
        }
    }

    fn pulse_rule(&mut self, pass: &RulePass) -> f64 {
        if self.procedure.is_idle() {
            // A vent left open by a stopped pulse closes with it.
            let fallback = if self.pulse.is_active() {
                0.0
            } else {
                pass.prev.hv_vent
            };
            self.pulse.reset();
            return self.manual.hv_vent.unwrap_or(fallback);
        }
        self.pulse.update(pass.dt, pass.hv_demand)
    }

    fn hv_refill_rule(&mut self, pass: &RulePass, next: &Controls) -> bool {
        let open = match self.procedure {
            ProcedureKind::CoolDown => {
                pass.hv_demand && next.supply_open && next.loop_vent > 0.0 && self.pulse.is_active()
            }
            ProcedureKind::RefillHv => pass.hv_demand,
            ProcedureKind::WarmUp | ProcedureKind::RefillSubcooler => false,
            ProcedureKind::Idle => {
                return self
                    .manual
                    .hv_refill_open
                    .unwrap_or(pass.prev.hv_refill_open);
            }
        };
        self.hv_refill.note_valve(open);
        open
    }

    fn sub_refill_rule(&mut self, pass: &RulePass) -> bool {
        if self.procedure.is_idle() {
            return self
                .manual
                .sub_refill_open
                .unwrap_or(pass.prev.sub_refill_open);
        }
        let open = self.procedure.allows_sub_refill() && pass.sub_demand;
        self.sub_refill.note_valve(open);
        open
    }

    fn purge_rule(&mut self, pass: &RulePass) -> bool {
        match self.procedure {
            ProcedureKind::WarmUp => {
                if pass.state.loop_pressure_bar <= self.params.purge_open_max_bar {
                    self.purge_latched = true;
                }
                self.purge_latched && !pass.warmup_done
            }
            ProcedureKind::CoolDown => false,
            ProcedureKind::RefillHv | ProcedureKind::RefillSubcooler => pass.prev.purge_open,
            ProcedureKind::Idle => self.manual.purge_open.unwrap_or(pass.prev.purge_open),
        }
    }

    fn pressure_control_rule(&self, pass: &RulePass, next: &Controls) -> bool {
        match self.procedure {
            ProcedureKind::CoolDown | ProcedureKind::RefillHv => !next.hv_refill_open,
            ProcedureKind::WarmUp => false,
            ProcedureKind::RefillSubcooler => pass.prev.press_ctrl_on,
            ProcedureKind::Idle => self.manual.press_ctrl_on.unwrap_or(pass.prev.press_ctrl_on),
        }
    }

    fn check_completion(&mut self, pass: &RulePass) {
        let done = match self.procedure {
            ProcedureKind::RefillHv => pass.state.hv_level_pct >= self.params.hv_refill.target_pct,
            ProcedureKind::RefillSubcooler => {
                pass.state.sub_level_pct >= self.params.sub_refill.target_pct
            }
            ProcedureKind::WarmUp => pass.warmup_done,
            ProcedureKind::CoolDown | ProcedureKind::Idle => false,
        };
        if done {
            info!(procedure = %self.procedure, "procedure complete");
            self.procedure = ProcedureKind::Idle;
            self.previous = ProcedureKind::Idle;
        }
    }
}
