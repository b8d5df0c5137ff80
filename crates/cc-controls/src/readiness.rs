//! Readiness predicate: a stable, operator-usable steady state.

use cc_sim::{Controls, State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessCriteria {
    /// Allowed |PT3 - setpoint| (bar).
    pub hv_pressure_tol_bar: f64,
    /// Allowed |PT1 - setpoint| (bar).
    pub loop_pressure_tol_bar: f64,
    /// LT23 must stay above this (%).
    pub min_hv_level_pct: f64,
    /// T5 must stay below this (K).
    pub max_supply_temp_k: f64,
}

impl Default for ReadinessCriteria {
    fn default() -> Self {
        Self {
            hv_pressure_tol_bar: 0.05,
            loop_pressure_tol_bar: 0.1,
            min_hv_level_pct: 20.0,
            max_supply_temp_k: 80.0,
        }
    }
}

impl ReadinessCriteria {
    pub fn is_ready(&self, state: &State, controls: &Controls) -> bool {
        let sp = controls.press_sp_bar;
        controls.supply_open
            && controls.return_open
            && controls.pump_running()
            && controls.press_ctrl_on
            && (state.hv_pressure_bar - sp).abs() < self.hv_pressure_tol_bar
            && (state.loop_pressure_bar - sp).abs() < self.loop_pressure_tol_bar
            && state.hv_level_pct > self.min_hv_level_pct
            && state.supply_temp_k < self.max_supply_temp_k
    }
}
