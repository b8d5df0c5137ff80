//! Tunable physical constants of the lumped plant model.

use serde::{Deserialize, Serialize};

/// Plant constants. Units are in the field suffixes.
///
/// Defaults reflect the accelerated tuning used for operator training: refill
/// and drain rates are faster than the real vessels so procedures finish in
/// minutes rather than hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    /// Loop flow at 80 Hz with the throttle fully open (L/min).
    pub q80_lpm: f64,
    /// Pump frequency at which `q80_lpm` is reached; higher commands saturate.
    pub pump_max_hz: f64,
    /// Effective LN2 density (kg/m^3).
    pub rho_kg_m3: f64,
    /// Effective LN2 specific heat (J/(kg K)).
    pub cp_j_kg_k: f64,
    /// Ambient temperature the loop returns to when purged or isolated (K).
    pub ambient_k: f64,
    /// Subcooling margin at full subcooler (K).
    pub delta_subcool_k: f64,
    /// Subcooler level giving full subcooling (%).
    pub subcool_full_level_pct: f64,
    /// Cooling time-constant coefficient: tau = k_tau / Q_eff (s L/min).
    pub k_tau_s_lpm: f64,
    /// Base warm-up time constant while purging (s).
    pub tau_warm_s: f64,
    /// Time constant toward ambient when isolated (s).
    pub tau_isolated_s: f64,
    /// Loop pressure at or below which purge warming applies (bar).
    pub purge_warm_max_bar: f64,
    /// Heater to heater-vessel pressurization gain at full output (bar/s).
    pub kh_bar_per_s: f64,
    /// Heater-vessel to loop pressure coupling (1/s).
    pub kc_per_s: f64,
    /// Loop-vent depressurization coefficient (1/s).
    pub kv_loop_vent_per_s: f64,
    /// HV-vent depressurization coefficient (1/s).
    pub kv_hv_vent_per_s: f64,
    /// Purge depressurization coefficient (1/s).
    pub kv_purge_per_s: f64,
    /// Natural heater-vessel leak toward 1 bar (1/s).
    pub leak_per_s: f64,
    /// Heater controller proportional gain (1/bar).
    pub heater_kp: f64,
    /// Heater controller integral gain (1/(bar s)).
    pub heater_ki: f64,
    /// Relief valve limit applied to both pressures (bar).
    pub relief_bar: f64,
    /// Temperature floor: cryogen boiling point (K).
    pub temp_floor_k: f64,
    /// Temperature ceiling of the model (K).
    pub temp_ceiling_k: f64,
    /// Mass-flow floor below which the load is treated as decoupled (kg/s).
    pub mdot_floor_kg_s: f64,
    /// Subcooler effective volume (L).
    pub sub_volume_l: f64,
    /// Subcooler fill rate with V19 open (L/s).
    pub sub_fill_lps: f64,
    /// Subcooler base consumption (L/s).
    pub sub_base_cons_lps: f64,
    /// Subcooler consumption per watt of coupled heat load ((L/s)/W).
    pub sub_cons_lps_per_w: f64,
    /// Open-loop vent penalty per L/min of vented flow ((L/s)/(L/min)).
    pub sub_vent_cons_lps_per_lpm: f64,
    /// Heater-vessel refill rate with V15 open (%/s).
    pub hv_refill_pctps: f64,
    /// Heater-vessel drain at full loop-vent opening (%/s).
    pub hv_loop_vent_drain_pctps: f64,
    /// Heater-vessel base consumption (%/s).
    pub hv_base_cons_pctps: f64,
    /// Heater-vessel consumption per watt of heat load ((%/s)/W).
    pub hv_power_cons_pctps_per_w: f64,
    /// Heater-vessel consumption at full heater output (%/s).
    pub hv_heater_cons_pctps: f64,
    /// Heater-vessel consumption at full HV-vent opening (%/s).
    pub hv_vent_cons_pctps: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            q80_lpm: 15.0,
            pump_max_hz: 80.0,
            rho_kg_m3: 800.0,
            cp_j_kg_k: 2000.0,
            ambient_k: 280.0,
            delta_subcool_k: 6.0,
            subcool_full_level_pct: 40.0,
            k_tau_s_lpm: 120.0,
            tau_warm_s: 180.0,
            tau_isolated_s: 1200.0,
            purge_warm_max_bar: 1.05,
            kh_bar_per_s: 0.5,
            kc_per_s: 0.4,
            kv_loop_vent_per_s: 0.5,
            kv_hv_vent_per_s: 0.5,
            kv_purge_per_s: 0.8,
            leak_per_s: 0.02,
            heater_kp: 1.0,
            heater_ki: 0.2,
            relief_bar: 4.5,
            temp_floor_k: 77.0,
            temp_ceiling_k: 500.0,
            mdot_floor_kg_s: 1e-6,
            sub_volume_l: 200.0,
            sub_fill_lps: 1.0 / 60.0,
            sub_base_cons_lps: 3.0 / 3600.0,
            sub_cons_lps_per_w: 0.023 / 3600.0,
            sub_vent_cons_lps_per_lpm: 0.004,
            hv_refill_pctps: 10.0 / 60.0,
            hv_loop_vent_drain_pctps: 1.0 / 60.0,
            hv_base_cons_pctps: 0.5 / 60.0,
            hv_power_cons_pctps_per_w: 0.0,
            hv_heater_cons_pctps: 1.0 / 60.0,
            hv_vent_cons_pctps: 0.5 / 60.0,
        }
    }
}
