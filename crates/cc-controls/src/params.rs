//! Sequencer tuning.

use crate::error::{ControlError, ControlResult};
use crate::hysteresis::RefillThresholds;
use crate::readiness::ReadinessCriteria;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerParams {
    /// Minimum pump frequency during cool-down (Hz).
    pub cooldown_pump_min_hz: f64,
    pub cooldown_throttle: f64,
    /// Minimum pump frequency while purging during warm-up (Hz).
    pub warmup_pump_min_hz: f64,
    pub warmup_throttle: f64,
    /// T6 below which the return valve closes the loop; also the full-vent stage bound (K).
    pub loop_close_k: f64,
    /// T6 at or above which the loop vent stays at the mid stage (K).
    pub vent_mid_above_k: f64,
    pub vent_full_opening: f64,
    pub vent_mid_opening: f64,
    /// Loop-vent floor while the heater vessel is being recharged.
    pub vent_hv_refill_min: f64,
    pub warmup_vent_opening: f64,
    /// V20 half-period (s).
    pub pulse_period_s: f64,
    pub hv_refill: RefillThresholds,
    pub sub_refill: RefillThresholds,
    /// Warm-up opens the purge at or below this loop pressure (bar).
    pub purge_open_max_bar: f64,
    /// Warm-up completes once T6 reaches ambient minus this margin (K).
    pub warmup_done_margin_k: f64,
    pub readiness: ReadinessCriteria,
}

impl Default for SequencerParams {
    fn default() -> Self {
        Self {
            cooldown_pump_min_hz: 30.0,
            cooldown_throttle: 0.6,
            warmup_pump_min_hz: 30.0,
            warmup_throttle: 1.0,
            loop_close_k: 200.0,
            vent_mid_above_k: 90.0,
            vent_full_opening: 1.0,
            vent_mid_opening: 0.35,
            vent_hv_refill_min: 0.3,
            warmup_vent_opening: 0.4,
            pulse_period_s: 1.0,
            hv_refill: RefillThresholds::HEATER_VESSEL,
            sub_refill: RefillThresholds::SUBCOOLER,
            purge_open_max_bar: 1.05,
            warmup_done_margin_k: 2.0,
            readiness: ReadinessCriteria::default(),
        }
    }
}

impl SequencerParams {
    /// Structural checks the sequencer relies on.
    pub fn validate(&self) -> ControlResult<()> {
        if !(self.pulse_period_s.is_finite() && self.pulse_period_s > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "pulse_period_s must be positive",
            });
        }
        if !(self.vent_mid_above_k < self.loop_close_k) {
            return Err(ControlError::InvalidArg {
                what: "vent_mid_above_k must be below loop_close_k",
            });
        }
        self.hv_refill.validate("heater_vessel")?;
        self.sub_refill.validate("subcooler")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SequencerParams::default().validate().is_ok());
    }

    #[test]
    fn zero_pulse_period_rejected() {
        let params = SequencerParams {
            pulse_period_s: 0.0,
            ..SequencerParams::default()
        };
        assert!(params.validate().is_err());
    }
}
