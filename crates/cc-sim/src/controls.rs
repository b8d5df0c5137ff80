//! Actuator outputs driven into the plant.

use cc_core::{clamp_non_negative, clamp_or_floor, clamp_unit};
use serde::{Deserialize, Serialize};

/// Every actuator output of the cooler, plus the heater integrator.
///
/// Field tags follow the P&ID: V9 supply, V11 return, V15 HV refill,
/// V19 subcooler refill, V21 purge, V10 throttle, V17 loop vent, V20 HV vent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    /// V9
    pub supply_open: bool,
    /// V11
    pub return_open: bool,
    /// V15
    pub hv_refill_open: bool,
    /// V19
    pub sub_refill_open: bool,
    /// V21
    pub purge_open: bool,
    /// V10 opening [0, 1].
    pub throttle: f64,
    /// V17 opening [0, 1].
    pub loop_vent: f64,
    /// V20 opening [0, 1].
    pub hv_vent: f64,
    /// Circulation pump frequency (Hz).
    pub pump_hz: f64,
    /// Heater-vessel pressure control enable.
    pub press_ctrl_on: bool,
    /// Heater-vessel pressure setpoint (bar).
    pub press_sp_bar: f64,
    /// Heater PI integrator state [0, 1]. Written by the plant step only.
    pub heater_u: f64,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            supply_open: false,
            return_open: false,
            hv_refill_open: false,
            sub_refill_open: false,
            purge_open: false,
            throttle: 0.6,
            loop_vent: 0.0,
            hv_vent: 0.0,
            pump_hz: 0.0,
            press_ctrl_on: false,
            press_sp_bar: 2.0,
            heater_u: 0.0,
        }
    }
}

impl Controls {
    /// Loop-active gate: supply and return open, purge closed.
    pub fn loop_active(&self) -> bool {
        self.supply_open && self.return_open && !self.purge_open
    }

    pub fn pump_running(&self) -> bool {
        self.pump_hz > 0.0
    }

    /// Copy with every continuous output clamped into its physical domain.
    ///
    /// Openings land in `[0, 1]`, pump frequency in `[0, inf)`, the setpoint in
    /// `[0, relief_bar]`. NaN reads as closed / stopped.
    pub fn sanitized(&self, relief_bar: f64) -> Self {
        Self {
            throttle: clamp_unit(self.throttle),
            loop_vent: clamp_unit(self.loop_vent),
            hv_vent: clamp_unit(self.hv_vent),
            pump_hz: clamp_non_negative(self.pump_hz),
            press_sp_bar: clamp_or_floor(self.press_sp_bar, 0.0, relief_bar),
            heater_u: clamp_unit(self.heater_u),
            ..self.clone()
        }
    }
}
