//! Fixed-order explicit plant integrator.
//!
//! One call to [`PhysicsEngine::step`] advances the plant by `dt`:
//! 1. pressures (heater integrator, heater vessel, loop coupling, vents)
//! 2. temperatures (supply relaxation, return rise across the load)
//! 3. levels (subcooler and heater-vessel mass balance)
//!
//! Later stages read the outputs of earlier stages from the same tick.

use crate::controls::Controls;
use crate::error::{SimError, SimResult};
use crate::heater::HeaterController;
use crate::params::PlantParams;
use crate::state::{ProcedureProgress, State};
use cc_core::units::constants::{LN2_BOIL_SLOPE_K_PER_BAR, LN2_BOILING_K};
use cc_core::{DIV_FLOOR, clamp_or_floor, clamp_pct, clamp_unit, ensure_finite, ensure_in_range, relax};

/// Upper end of the pressure range the boiling-point fit is valid for (bar).
const BOIL_FIT_MAX_BAR: f64 = 5.0;

/// Volumetric flows derived from the current actuator outputs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Flows {
    /// Pump/throttle flow before any valve gating (L/min).
    pub base_lpm: f64,
    /// Closed-loop flow through the load, as shown on FT18 (L/min).
    pub loop_lpm: f64,
    /// Heat-carrying flow, including the open-loop vent path (L/min).
    pub effective_lpm: f64,
}

impl Flows {
    /// Flow leaving through the loop vent instead of returning (L/min).
    pub fn vented_lpm(&self) -> f64 {
        (self.effective_lpm - self.loop_lpm).max(0.0)
    }
}

/// Lumped plant model. Holds the readings and the actuator outputs it integrates against.
#[derive(Debug, Clone)]
pub struct PhysicsEngine {
    params: PlantParams,
    state: State,
    controls: Controls,
    heater_output: f64,
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self {
            params: PlantParams::default(),
            state: State::default(),
            controls: Controls::default(),
            heater_output: 0.0,
        }
    }
}

fn check_positive(v: f64, what: &'static str) -> SimResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidArg { what })
    }
}

impl PhysicsEngine {
    /// Create a plant from constants and initial conditions.
    ///
    /// Initial readings and actuator outputs are clamped into their domains.
    pub fn new(params: PlantParams, state: State, controls: Controls) -> SimResult<Self> {
        check_positive(params.q80_lpm, "q80_lpm must be positive")?;
        check_positive(params.pump_max_hz, "pump_max_hz must be positive")?;
        check_positive(params.rho_kg_m3, "rho_kg_m3 must be positive")?;
        check_positive(params.cp_j_kg_k, "cp_j_kg_k must be positive")?;
        check_positive(params.k_tau_s_lpm, "k_tau_s_lpm must be positive")?;
        check_positive(params.tau_warm_s, "tau_warm_s must be positive")?;
        check_positive(params.tau_isolated_s, "tau_isolated_s must be positive")?;
        check_positive(params.sub_volume_l, "sub_volume_l must be positive")?;
        check_positive(params.relief_bar, "relief_bar must be positive")?;
        check_positive(
            params.subcool_full_level_pct,
            "subcool_full_level_pct must be positive",
        )?;
        if params.temp_floor_k >= params.temp_ceiling_k {
            return Err(SimError::NonPhysical {
                what: "temp_floor_k must be below temp_ceiling_k",
            });
        }
        ensure_in_range(
            params.ambient_k,
            params.temp_floor_k,
            params.temp_ceiling_k,
            "ambient_k",
        )?;
        ensure_finite(params.heater_kp, "heater_kp")?;
        ensure_finite(params.heater_ki, "heater_ki")?;

        let controls = controls.sanitized(params.relief_bar);
        let mut engine = Self {
            params,
            state: State::default(),
            controls,
            heater_output: 0.0,
        };
        engine.set_state(state);
        Ok(engine)
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Heater drive applied during the last step, in `[0, 1]`.
    pub fn heater_output(&self) -> f64 {
        self.heater_output
    }

    /// Replace the actuator outputs, clamping them into their physical domain.
    pub fn set_controls(&mut self, controls: Controls) {
        self.controls = controls.sanitized(self.params.relief_bar);
    }

    /// Replace the readings, clamping them into their physical domain.
    pub fn set_state(&mut self, state: State) {
        let p = &self.params;
        self.state = State {
            supply_temp_k: clamp_or_floor(state.supply_temp_k, p.temp_floor_k, p.temp_ceiling_k),
            return_temp_k: clamp_or_floor(state.return_temp_k, p.temp_floor_k, p.temp_ceiling_k),
            loop_pressure_bar: clamp_or_floor(state.loop_pressure_bar, 0.0, p.relief_bar),
            hv_pressure_bar: clamp_or_floor(state.hv_pressure_bar, 0.0, p.relief_bar),
            sub_level_pct: clamp_pct(state.sub_level_pct),
            hv_level_pct: clamp_pct(state.hv_level_pct),
            flow_lpm: clamp_or_floor(state.flow_lpm, 0.0, f64::MAX),
            ..state
        };
    }

    /// Publish the sequencer's readiness verdict and progress tag on the readings.
    pub fn annotate(&mut self, ready: bool, progress: ProcedureProgress) {
        self.state.ready = ready;
        self.state.progress = progress;
    }

    /// Saturated-liquid temperature of the cryogen at loop pressure (K).
    pub fn boiling_point_k(&self, pressure_bar: f64) -> f64 {
        LN2_BOILING_K + LN2_BOIL_SLOPE_K_PER_BAR * clamp_or_floor(pressure_bar, 0.0, BOIL_FIT_MAX_BAR)
    }

    /// Subcooling effectiveness from the subcooler level, in `[0, 1]`.
    pub fn subcool_ratio(&self) -> f64 {
        clamp_unit(self.state.sub_level_pct / self.params.subcool_full_level_pct)
    }

    /// Flows implied by the current actuator outputs.
    pub fn flows(&self) -> Flows {
        let c = &self.controls;
        let p = &self.params;
        let pump = clamp_or_floor(c.pump_hz, 0.0, p.pump_max_hz);
        let base = p.q80_lpm * (pump / p.pump_max_hz) * (0.4 + 0.6 * clamp_unit(c.throttle));
        let loop_lpm = if c.loop_active() { base } else { 0.0 };
        let transports = c.supply_open && !c.purge_open && (c.return_open || c.loop_vent > 0.01);
        let effective_lpm = if transports { base } else { 0.0 };
        Flows {
            base_lpm: base,
            loop_lpm,
            effective_lpm,
        }
    }

    /// Advance the plant by `dt` seconds under `heat_load_w` watts.
    ///
    /// A non-positive or non-finite `dt` leaves the plant untouched. Negative or
    /// non-finite heat loads are treated as zero.
    pub fn step(&mut self, dt: f64, heat_load_w: f64) -> State {
        if !(dt.is_finite() && dt > 0.0) {
            tracing::debug!(dt, "skipping plant step with invalid dt");
            return self.state.clone();
        }
        let power_w = if heat_load_w.is_finite() {
            heat_load_w.max(0.0)
        } else {
            0.0
        };

        self.update_pressures(dt);
        let flows = self.flows();
        self.update_temperatures(dt, power_w, &flows);
        self.update_levels(dt, power_w, &flows);
        self.state.clone()
    }

    fn update_pressures(&mut self, dt: f64) {
        let Self {
            params: p,
            state: s,
            controls: c,
            heater_output,
        } = self;

        if c.press_ctrl_on {
            let pi = HeaterController::new(p.heater_kp, p.heater_ki);
            let (integral, output) = pi.update(c.heater_u, s.hv_pressure_bar, c.press_sp_bar, dt);
            c.heater_u = integral;
            *heater_output = output;
        } else {
            c.heater_u = 0.0;
            *heater_output = 0.0;
        }

        // Vent and leak terms only bleed the gauge excess and never push below 1 bar.
        let hv_excess = (s.hv_pressure_bar - 1.0).max(0.0);
        let hv_bleed =
            ((p.kv_hv_vent_per_s * c.hv_vent + p.leak_per_s) * hv_excess * dt).min(hv_excess);
        let hv_next = s.hv_pressure_bar + p.kh_bar_per_s * *heater_output * dt - hv_bleed;
        s.hv_pressure_bar = clamp_or_floor(hv_next, 0.0, p.relief_bar);

        let coupled = c.supply_open && c.return_open && c.pump_running();
        let coupling = if coupled {
            p.kc_per_s * (s.hv_pressure_bar - s.loop_pressure_bar) * dt
        } else {
            0.0
        };
        let purge = if c.purge_open { 1.0 } else { 0.0 };
        let loop_excess = (s.loop_pressure_bar - 1.0).max(0.0);
        let loop_bleed = ((p.kv_loop_vent_per_s * c.loop_vent + p.kv_purge_per_s * purge)
            * loop_excess
            * dt)
            .min(loop_excess);
        let loop_next = s.loop_pressure_bar + coupling - loop_bleed;
        s.loop_pressure_bar = clamp_or_floor(loop_next, 0.0, p.relief_bar);
    }

    fn update_temperatures(&mut self, dt: f64, power_w: f64, flows: &Flows) {
        let rsc = self.subcool_ratio();
        let t_boil = self.boiling_point_k(self.state.loop_pressure_bar);
        let Self {
            params: p,
            state: s,
            controls: c,
            ..
        } = self;

        let t_target = (t_boil - p.delta_subcool_k * rsc).max(p.temp_floor_k);
        let supply = if c.purge_open && s.loop_pressure_bar <= p.purge_warm_max_bar {
            let pump_boost = if c.pump_running() { 0.3 } else { 0.0 };
            let tau = p.tau_warm_s / (1.0 + 0.3 * rsc + pump_boost);
            relax(s.supply_temp_k, p.ambient_k, dt, tau)
        } else if flows.effective_lpm > DIV_FLOOR {
            let tau = p.k_tau_s_lpm / flows.effective_lpm.max(DIV_FLOOR);
            relax(s.supply_temp_k, t_target, dt, tau)
        } else {
            relax(s.supply_temp_k, p.ambient_k, dt, p.tau_isolated_s)
        };
        s.supply_temp_k = clamp_or_floor(supply, p.temp_floor_k, p.temp_ceiling_k);

        let mdot_kg_s = p.rho_kg_m3 * (flows.effective_lpm / 60.0) * 1e-3;
        let rise_k = if mdot_kg_s > p.mdot_floor_kg_s {
            power_w / (mdot_kg_s * p.cp_j_kg_k)
        } else {
            0.0
        };
        s.return_temp_k = clamp_or_floor(
            s.supply_temp_k + rise_k,
            p.temp_floor_k,
            p.temp_ceiling_k,
        );
        s.flow_lpm = flows.loop_lpm;
    }

    fn update_levels(&mut self, dt: f64, power_w: f64, flows: &Flows) {
        let Self {
            params: p,
            state: s,
            controls: c,
            heater_output,
        } = self;

        // The load only boils off subcooler liquid while the loop carries it there.
        let coupled_load_w = if flows.effective_lpm > DIV_FLOOR {
            power_w
        } else {
            0.0
        };
        let cons_lps = p.sub_base_cons_lps
            + p.sub_cons_lps_per_w * coupled_load_w
            + p.sub_vent_cons_lps_per_lpm * flows.vented_lpm();
        let fill_lps = if c.sub_refill_open { p.sub_fill_lps } else { 0.0 };
        let d_sub_pct = (fill_lps - cons_lps) / p.sub_volume_l * 100.0;
        s.sub_level_pct = clamp_pct(s.sub_level_pct + d_sub_pct * dt);

        let mut d_hv_pct = 0.0;
        if c.hv_refill_open {
            d_hv_pct += p.hv_refill_pctps;
        }
        d_hv_pct -= p.hv_loop_vent_drain_pctps * c.loop_vent;
        d_hv_pct -= p.hv_base_cons_pctps
            + p.hv_power_cons_pctps_per_w * power_w
            + p.hv_heater_cons_pctps * *heater_output
            + p.hv_vent_cons_pctps * c.hv_vent;
        s.hv_level_pct = clamp_pct(s.hv_level_pct + d_hv_pct * dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loop_controls() -> Controls {
        Controls {
            supply_open: true,
            return_open: true,
            pump_hz: 80.0,
            throttle: 1.0,
            ..Controls::default()
        }
    }

    #[test]
    fn flow_formula_at_full_speed() {
        let mut engine = PhysicsEngine::default();
        engine.set_controls(loop_controls());
        let flows = engine.flows();
        assert!((flows.base_lpm - 15.0).abs() < 1e-12);
        assert_eq!(flows.loop_lpm, flows.base_lpm);
        assert_eq!(flows.vented_lpm(), 0.0);
    }

    #[test]
    fn vent_path_transports_without_return() {
        let mut engine = PhysicsEngine::default();
        engine.set_controls(Controls {
            return_open: false,
            loop_vent: 1.0,
            ..loop_controls()
        });
        let flows = engine.flows();
        assert_eq!(flows.loop_lpm, 0.0);
        assert!(flows.effective_lpm > 0.0);
        assert_eq!(flows.vented_lpm(), flows.effective_lpm);
    }

    #[test]
    fn boiling_point_fit() {
        let engine = PhysicsEngine::default();
        assert!((engine.boiling_point_k(1.0) - 80.8).abs() < 1e-9);
        assert!((engine.boiling_point_k(9.0) - 96.0).abs() < 1e-9);
        assert!((engine.boiling_point_k(-1.0) - 77.0).abs() < 1e-9);
    }

    #[test]
    fn heater_control_raises_vessel_pressure_toward_setpoint() {
        let mut engine = PhysicsEngine::default();
        engine.set_controls(Controls {
            press_ctrl_on: true,
            press_sp_bar: 2.0,
            ..Controls::default()
        });
        for _ in 0..600 {
            engine.step(0.1, 0.0);
        }
        let p = engine.state().hv_pressure_bar;
        assert!((p - 2.0).abs() < 0.05, "hv pressure {p}");
        assert!(engine.controls().heater_u <= 1.0);
    }

    #[test]
    fn heater_integrator_resets_when_control_off() {
        let mut engine = PhysicsEngine::default();
        engine.set_controls(Controls {
            press_ctrl_on: true,
            ..Controls::default()
        });
        engine.step(0.1, 0.0);
        assert!(engine.heater_output() > 0.0);
        let mut c = engine.controls().clone();
        c.press_ctrl_on = false;
        engine.set_controls(c);
        engine.step(0.1, 0.0);
        assert_eq!(engine.controls().heater_u, 0.0);
        assert_eq!(engine.heater_output(), 0.0);
    }

    #[test]
    fn pressures_never_exceed_relief() {
        let mut engine = PhysicsEngine::default();
        engine.set_controls(Controls {
            press_ctrl_on: true,
            press_sp_bar: 10.0,
            ..loop_controls()
        });
        for _ in 0..2000 {
            let s = engine.step(0.5, 0.0);
            assert!(s.hv_pressure_bar <= engine.params().relief_bar);
            assert!(s.loop_pressure_bar <= engine.params().relief_bar);
        }
    }

    #[test]
    fn invalid_dt_is_a_no_op() {
        let mut engine = PhysicsEngine::default();
        let before = engine.state().clone();
        assert_eq!(engine.step(0.0, 100.0), before);
        assert_eq!(engine.step(f64::NAN, 100.0), before);
    }

    #[test]
    fn invalid_params_rejected() {
        let params = PlantParams {
            sub_volume_l: 0.0,
            ..PlantParams::default()
        };
        assert!(PhysicsEngine::new(params, State::default(), Controls::default()).is_err());

        let params = PlantParams {
            temp_floor_k: 600.0,
            ..PlantParams::default()
        };
        assert!(PhysicsEngine::new(params, State::default(), Controls::default()).is_err());
    }

    #[test]
    fn initial_conditions_are_clamped() {
        let state = State {
            hv_level_pct: 130.0,
            supply_temp_k: 10.0,
            loop_pressure_bar: 50.0,
            ..State::default()
        };
        let engine = PhysicsEngine::new(PlantParams::default(), state, Controls::default()).unwrap();
        assert_eq!(engine.state().hv_level_pct, 100.0);
        assert_eq!(engine.state().supply_temp_k, 77.0);
        assert_eq!(engine.state().loop_pressure_bar, 4.5);
    }

    #[test]
    fn ambient_outside_model_range_rejected() {
        let params = PlantParams {
            ambient_k: 600.0,
            ..PlantParams::default()
        };
        let err = PhysicsEngine::new(params, State::default(), Controls::default()).unwrap_err();
        assert!(matches!(err, SimError::Numeric(_)));

        let params = PlantParams {
            heater_ki: f64::NAN,
            ..PlantParams::default()
        };
        assert!(PhysicsEngine::new(params, State::default(), Controls::default()).is_err());
    }
}
