//! Operator-requested actuator values, honored only while no procedure runs.

use crate::procedure::RefillCircuit;
use serde::{Deserialize, Serialize};

/// Per-actuator manual overrides. `None` leaves the actuator where it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualCommands {
    pub supply_open: Option<bool>,
    pub return_open: Option<bool>,
    pub hv_refill_open: Option<bool>,
    pub sub_refill_open: Option<bool>,
    pub purge_open: Option<bool>,
    pub throttle: Option<f64>,
    pub loop_vent: Option<f64>,
    pub hv_vent: Option<f64>,
    pub pump_hz: Option<f64>,
    pub press_ctrl_on: Option<bool>,
}

/// Safe actuator sets the operating logic can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    /// Everything closed, pump stopped, throttle wide open, pressure control off.
    Stop,
    /// `Stop` with both vents fully open.
    Off,
    /// `Stop` with the purge valve open.
    SafeShutdown,
}

impl ManualCommands {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(&mut self, other: &ManualCommands) {
        fn pick<T: Copy>(dst: &mut Option<T>, src: Option<T>) {
            if src.is_some() {
                *dst = src;
            }
        }
        pick(&mut self.supply_open, other.supply_open);
        pick(&mut self.return_open, other.return_open);
        pick(&mut self.hv_refill_open, other.hv_refill_open);
        pick(&mut self.sub_refill_open, other.sub_refill_open);
        pick(&mut self.purge_open, other.purge_open);
        pick(&mut self.throttle, other.throttle);
        pick(&mut self.loop_vent, other.loop_vent);
        pick(&mut self.hv_vent, other.hv_vent);
        pick(&mut self.pump_hz, other.pump_hz);
        pick(&mut self.press_ctrl_on, other.press_ctrl_on);
    }

    /// Full actuator set for a safe posture.
    pub fn posture(posture: Posture) -> Self {
        let stop = Self {
            supply_open: Some(false),
            return_open: Some(false),
            hv_refill_open: Some(false),
            sub_refill_open: Some(false),
            purge_open: Some(false),
            throttle: Some(1.0),
            loop_vent: Some(0.0),
            hv_vent: Some(0.0),
            pump_hz: Some(0.0),
            press_ctrl_on: Some(false),
        };
        match posture {
            Posture::Stop => stop,
            Posture::Off => Self {
                loop_vent: Some(1.0),
                hv_vent: Some(1.0),
                ..stop
            },
            Posture::SafeShutdown => Self {
                purge_open: Some(true),
                ..stop
            },
        }
    }

    /// Overrides that close one refill circuit after its procedure is stopped.
    ///
    /// The heater-vessel set also closes the pulse vent and hands the vessel back to
    /// pressure control.
    pub fn refill_off(circuit: RefillCircuit) -> Self {
        match circuit {
            RefillCircuit::HeaterVessel => Self {
                hv_refill_open: Some(false),
                hv_vent: Some(0.0),
                press_ctrl_on: Some(true),
                ..Self::default()
            },
            RefillCircuit::Subcooler => Self {
                sub_refill_open: Some(false),
                ..Self::default()
            },
        }
    }
}
