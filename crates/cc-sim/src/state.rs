//! Plant readings.

use cc_core::units::{Pressure, Temperature, VolumeRate, bar, k, lpm};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress tag published alongside the readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcedureProgress {
    #[default]
    Idle,
    CoolingDown,
    WarmingUp,
    RefillingHeaterVessel,
    RefillingSubcooler,
    Held,
}

impl ProcedureProgress {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureProgress::Idle => "IDLE",
            ProcedureProgress::CoolingDown => "COOLING",
            ProcedureProgress::WarmingUp => "WARMUP",
            ProcedureProgress::RefillingHeaterVessel => "REFILL_HV",
            ProcedureProgress::RefillingSubcooler => "REFILL_SUB",
            ProcedureProgress::Held => "HOLD",
        }
    }
}

impl fmt::Display for ProcedureProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plant readings after a step. Sensor tags follow the P&ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    /// T5 supply temperature (K).
    pub supply_temp_k: f64,
    /// T6 return temperature downstream of the thermal load (K).
    pub return_temp_k: f64,
    /// PT1 loop pressure (bar).
    pub loop_pressure_bar: f64,
    /// PT3 heater-vessel pressure (bar).
    pub hv_pressure_bar: f64,
    /// LT19 subcooler level (%).
    pub sub_level_pct: f64,
    /// LT23 heater-vessel level (%).
    pub hv_level_pct: f64,
    /// FT18 loop flow (L/min).
    pub flow_lpm: f64,
    pub ready: bool,
    pub progress: ProcedureProgress,
}

impl Default for State {
    fn default() -> Self {
        Self {
            supply_temp_k: 280.0,
            return_temp_k: 280.0,
            loop_pressure_bar: 1.0,
            hv_pressure_bar: 1.0,
            sub_level_pct: 40.0,
            hv_level_pct: 30.0,
            flow_lpm: 0.0,
            ready: false,
            progress: ProcedureProgress::Idle,
        }
    }
}

impl State {
    pub fn supply_temperature(&self) -> Temperature {
        k(self.supply_temp_k)
    }

    pub fn return_temperature(&self) -> Temperature {
        k(self.return_temp_k)
    }

    pub fn loop_pressure(&self) -> Pressure {
        bar(self.loop_pressure_bar)
    }

    pub fn hv_pressure(&self) -> Pressure {
        bar(self.hv_pressure_bar)
    }

    pub fn flow(&self) -> VolumeRate {
        lpm(self.flow_lpm)
    }

    /// Return-minus-supply temperature rise across the thermal load.
    pub fn load_delta_k(&self) -> f64 {
        self.return_temp_k - self.supply_temp_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_core::units::{in_bar, in_kelvin, in_lpm};

    #[test]
    fn typed_accessors_match_raw_fields() {
        let s = State::default();
        assert!((in_kelvin(s.supply_temperature()) - 280.0).abs() < 1e-9);
        assert!((in_bar(s.loop_pressure()) - 1.0).abs() < 1e-12);
        assert!((in_bar(s.hv_pressure()) - 1.0).abs() < 1e-12);
        assert!((in_kelvin(s.return_temperature()) - 280.0).abs() < 1e-9);
        let flowing = State {
            flow_lpm: 4.5,
            ..State::default()
        };
        assert!((in_lpm(flowing.flow()) - 4.5).abs() < 1e-9);
        assert_eq!(s.load_delta_k(), 0.0);
    }

    #[test]
    fn progress_labels() {
        assert_eq!(ProcedureProgress::CoolingDown.to_string(), "COOLING");
        assert_eq!(ProcedureProgress::default(), ProcedureProgress::Idle);
    }
}
