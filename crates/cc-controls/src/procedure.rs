//! Automatic procedure kinds and refill circuits.

use cc_sim::ProcedureProgress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The automatic procedure the sequencer is running. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureKind {
    #[default]
    Idle,
    CoolDown,
    WarmUp,
    RefillHv,
    RefillSubcooler,
}

impl ProcedureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureKind::Idle => "idle",
            ProcedureKind::CoolDown => "cool_down",
            ProcedureKind::WarmUp => "warm_up",
            ProcedureKind::RefillHv => "refill_hv",
            ProcedureKind::RefillSubcooler => "refill_subcooler",
        }
    }

    pub fn is_idle(self) -> bool {
        self == ProcedureKind::Idle
    }

    /// Whether the heater-vessel refill circuit may raise demand in this procedure.
    pub fn allows_hv_refill(self) -> bool {
        matches!(self, ProcedureKind::CoolDown | ProcedureKind::RefillHv)
    }

    /// Whether the subcooler refill circuit may raise demand in this procedure.
    pub fn allows_sub_refill(self) -> bool {
        matches!(
            self,
            ProcedureKind::CoolDown | ProcedureKind::RefillHv | ProcedureKind::RefillSubcooler
        )
    }

    /// Progress tag published on the plant readings.
    pub fn progress(self, held: bool) -> ProcedureProgress {
        if held && !self.is_idle() {
            return ProcedureProgress::Held;
        }
        match self {
            ProcedureKind::Idle => ProcedureProgress::Idle,
            ProcedureKind::CoolDown => ProcedureProgress::CoolingDown,
            ProcedureKind::WarmUp => ProcedureProgress::WarmingUp,
            ProcedureKind::RefillHv => ProcedureProgress::RefillingHeaterVessel,
            ProcedureKind::RefillSubcooler => ProcedureProgress::RefillingSubcooler,
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refill circuit with its own valve and hysteresis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefillCircuit {
    /// V15 into the heater vessel, level LT23.
    HeaterVessel,
    /// V19 into the subcooler, level LT19.
    Subcooler,
}

impl RefillCircuit {
    pub fn as_str(self) -> &'static str {
        match self {
            RefillCircuit::HeaterVessel => "heater_vessel",
            RefillCircuit::Subcooler => "subcooler",
        }
    }

    /// The refill procedure dedicated to this circuit.
    pub fn procedure(self) -> ProcedureKind {
        match self {
            RefillCircuit::HeaterVessel => ProcedureKind::RefillHv,
            RefillCircuit::Subcooler => ProcedureKind::RefillSubcooler,
        }
    }
}

impl fmt::Display for RefillCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refill_modes() {
        assert!(ProcedureKind::CoolDown.allows_hv_refill());
        assert!(!ProcedureKind::WarmUp.allows_hv_refill());
        assert!(!ProcedureKind::RefillSubcooler.allows_hv_refill());
        assert!(ProcedureKind::RefillHv.allows_sub_refill());
        assert!(!ProcedureKind::Idle.allows_sub_refill());
    }

    #[test]
    fn held_progress_tag() {
        assert_eq!(ProcedureKind::CoolDown.progress(true), ProcedureProgress::Held);
        assert_eq!(ProcedureKind::Idle.progress(true), ProcedureProgress::Idle);
        assert_eq!(
            RefillCircuit::Subcooler.procedure().progress(false),
            ProcedureProgress::RefillingSubcooler
        );
    }
}
