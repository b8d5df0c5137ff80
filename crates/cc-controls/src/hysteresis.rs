//! Per-circuit refill hysteresis.
//!
//! Each refill circuit runs a one-time initial fill, then a recharge cycle:
//!
//! ```text
//!   Idle --level < arm_below--> Armed --valve opens--> Filling
//!    ^                            |                       |
//!    +------level > disarm_above--+                       |
//!    +------------------level >= target-------------------+
//! ```
//!
//! Once filling has begun only the target level ends the cycle.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Level thresholds for one refill circuit (%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefillThresholds {
    /// Recharge arms below this level.
    pub arm_below_pct: f64,
    /// An armed recharge that has not started filling disarms above this level.
    pub disarm_above_pct: f64,
    /// Fill target for both the initial fill and a recharge.
    pub target_pct: f64,
}

impl RefillThresholds {
    pub const HEATER_VESSEL: Self = Self {
        arm_below_pct: 39.0,
        disarm_above_pct: 41.0,
        target_pct: 90.0,
    };

    pub const SUBCOOLER: Self = Self {
        arm_below_pct: 78.0,
        disarm_above_pct: 80.0,
        target_pct: 90.0,
    };

    /// Check `0 <= arm_below <= disarm_above < target <= 100`.
    pub fn validate(&self, circuit: &'static str) -> ControlResult<()> {
        let all_finite = [self.arm_below_pct, self.disarm_above_pct, self.target_pct]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ControlError::InvalidThresholds {
                circuit,
                reason: "thresholds must be finite",
            });
        }
        if self.arm_below_pct < 0.0 || self.target_pct > 100.0 {
            return Err(ControlError::InvalidThresholds {
                circuit,
                reason: "thresholds must lie within 0..=100 %",
            });
        }
        if self.arm_below_pct > self.disarm_above_pct || self.disarm_above_pct >= self.target_pct {
            return Err(ControlError::InvalidThresholds {
                circuit,
                reason: "expected arm_below <= disarm_above < target",
            });
        }
        Ok(())
    }
}

/// Recharge phase after the initial fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RechargePhase {
    #[default]
    Idle,
    Armed,
    Filling,
}

/// Hysteresis record for one refill circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefillHysteresis {
    pub initial_fill_done: bool,
    pub phase: RechargePhase,
    /// Armed by a refill request rather than by level; exempt from disarming.
    forced: bool,
}

impl RefillHysteresis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to initial-fill-pending.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Arm the recharge regardless of level. The initial fill is treated as done.
    pub fn force_armed(&mut self) {
        self.initial_fill_done = true;
        self.phase = RechargePhase::Armed;
        self.forced = true;
    }

    /// Advance the level-driven transitions and report whether the circuit wants liquid.
    pub fn demand(&mut self, level_pct: f64, th: &RefillThresholds) -> bool {
        if !self.initial_fill_done {
            if level_pct < th.target_pct {
                return true;
            }
            self.initial_fill_done = true;
            self.phase = RechargePhase::Idle;
        }

        match self.phase {
            RechargePhase::Idle => {
                if level_pct < th.arm_below_pct {
                    self.phase = RechargePhase::Armed;
                }
            }
            RechargePhase::Armed => {
                if level_pct >= th.target_pct {
                    self.disarm();
                } else if level_pct > th.disarm_above_pct && !self.forced {
                    self.disarm();
                }
            }
            RechargePhase::Filling => {
                if level_pct >= th.target_pct {
                    self.disarm();
                }
            }
        }
        self.phase != RechargePhase::Idle
    }

    /// Record the valve position chosen this tick. An armed recharge starts filling
    /// only once the valve actually opens.
    pub fn note_valve(&mut self, open: bool) {
        if open && self.phase == RechargePhase::Armed {
            self.phase = RechargePhase::Filling;
            self.forced = false;
        }
    }

    pub fn is_filling(&self) -> bool {
        self.phase == RechargePhase::Filling
    }

    fn disarm(&mut self) {
        self.phase = RechargePhase::Idle;
        self.forced = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HV: RefillThresholds = RefillThresholds::HEATER_VESSEL;

    fn after_initial_fill() -> RefillHysteresis {
        let mut h = RefillHysteresis::new();
        assert!(!h.demand(95.0, &HV));
        assert!(h.initial_fill_done);
        h
    }

    #[test]
    fn initial_fill_runs_to_target() {
        let mut h = RefillHysteresis::new();
        for level in [30.0, 50.0, 89.9] {
            assert!(h.demand(level, &HV));
        }
        assert!(!h.demand(90.0, &HV));
        assert!(h.initial_fill_done);
    }

    #[test]
    fn arms_below_and_disarms_above_without_filling() {
        let mut h = after_initial_fill();
        assert!(!h.demand(40.0, &HV));
        assert!(h.demand(38.9, &HV));
        assert_eq!(h.phase, RechargePhase::Armed);
        assert!(h.demand(40.5, &HV));
        assert!(!h.demand(41.1, &HV));
        assert_eq!(h.phase, RechargePhase::Idle);
    }

    #[test]
    fn filling_holds_until_target() {
        let mut h = after_initial_fill();
        assert!(h.demand(38.0, &HV));
        h.note_valve(true);
        assert!(h.is_filling());
        for level in [41.5, 60.0, 89.99] {
            assert!(h.demand(level, &HV));
        }
        assert!(!h.demand(90.0, &HV));
        assert_eq!(h.phase, RechargePhase::Idle);
    }

    #[test]
    fn closed_valve_keeps_armed() {
        let mut h = after_initial_fill();
        h.demand(30.0, &HV);
        h.note_valve(false);
        assert_eq!(h.phase, RechargePhase::Armed);
    }

    #[test]
    fn forced_arm_survives_high_level() {
        let mut h = RefillHysteresis::new();
        h.force_armed();
        assert!(h.demand(60.0, &HV));
        h.note_valve(true);
        assert!(h.is_filling());
        assert!(!h.demand(90.0, &HV));
    }

    #[test]
    fn reset_restores_initial_fill() {
        let mut h = after_initial_fill();
        h.reset();
        assert!(!h.initial_fill_done);
        assert!(h.demand(80.0, &HV));
    }

    #[test]
    fn threshold_order_checked() {
        assert!(RefillThresholds::HEATER_VESSEL.validate("hv").is_ok());
        assert!(RefillThresholds::SUBCOOLER.validate("sub").is_ok());
        let bad = RefillThresholds {
            arm_below_pct: 50.0,
            disarm_above_pct: 45.0,
            target_pct: 90.0,
        };
        assert!(bad.validate("hv").is_err());
        let bad = RefillThresholds {
            target_pct: f64::NAN,
            ..RefillThresholds::SUBCOOLER
        };
        assert!(bad.validate("sub").is_err());
    }
}
