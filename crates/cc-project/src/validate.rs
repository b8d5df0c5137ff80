//! Configuration validation.
//!
//! Every numeric field has a documented range; violations report the field as a
//! dotted key (`plant.q80_lpm`, `sequencer.hv_refill.target_pct`). Bounds are
//! inclusive. Strictly positive quantities use [`POSITIVE`] as their lower bound.

use crate::schema::{LATEST_VERSION, TwinConfig};
use cc_controls::RefillThresholds;
use cc_logic::InterlockLimits;

/// Lower bound standing in for "strictly positive".
pub const POSITIVE: f64 = 1e-9;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Out of range: {key} = {value} (expected {min} ..= {max})")]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid order: {key} ({reason})")]
    InvalidOrder { key: String, reason: String },

    #[error("Unsupported version: {version} (latest is {latest})")]
    UnsupportedVersion { version: u32, latest: u32 },
}

type Checked = Result<(), ValidationError>;

fn range(key: &str, value: f64, min: f64, max: f64) -> Checked {
    // NaN fails both comparisons and is rejected here too.
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            key: key.to_string(),
            value,
            min,
            max,
        })
    }
}

fn order(key: &str, ok: bool, reason: &str) -> Checked {
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidOrder {
            key: key.to_string(),
            reason: reason.to_string(),
        })
    }
}

pub fn validate_config(config: &TwinConfig) -> Checked {
    if config.version == 0 || config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
            latest: LATEST_VERSION,
        });
    }
    validate_plant(config)?;
    validate_sequencer(config)?;
    validate_interlock(&config.interlock)?;
    validate_operating(config)?;
    validate_initial(config)?;
    Ok(())
}

fn validate_plant(config: &TwinConfig) -> Checked {
    let p = &config.plant;
    let rates = [
        ("plant.q80_lpm", p.q80_lpm, POSITIVE, 200.0),
        ("plant.pump_max_hz", p.pump_max_hz, POSITIVE, 200.0),
        ("plant.rho_kg_m3", p.rho_kg_m3, 1.0, 2000.0),
        ("plant.cp_j_kg_k", p.cp_j_kg_k, 1.0, 10_000.0),
        ("plant.ambient_k", p.ambient_k, 200.0, 350.0),
        ("plant.delta_subcool_k", p.delta_subcool_k, 0.0, 20.0),
        ("plant.subcool_full_level_pct", p.subcool_full_level_pct, POSITIVE, 100.0),
        ("plant.k_tau_s_lpm", p.k_tau_s_lpm, POSITIVE, 1e5),
        ("plant.tau_warm_s", p.tau_warm_s, POSITIVE, 1e5),
        ("plant.tau_isolated_s", p.tau_isolated_s, POSITIVE, 1e6),
        ("plant.purge_warm_max_bar", p.purge_warm_max_bar, 1.0, 5.0),
        ("plant.kh_bar_per_s", p.kh_bar_per_s, 0.0, 10.0),
        ("plant.kc_per_s", p.kc_per_s, 0.0, 10.0),
        ("plant.kv_loop_vent_per_s", p.kv_loop_vent_per_s, 0.0, 10.0),
        ("plant.kv_hv_vent_per_s", p.kv_hv_vent_per_s, 0.0, 10.0),
        ("plant.kv_purge_per_s", p.kv_purge_per_s, 0.0, 10.0),
        ("plant.leak_per_s", p.leak_per_s, 0.0, 1.0),
        ("plant.heater_kp", p.heater_kp, 0.0, 100.0),
        ("plant.heater_ki", p.heater_ki, 0.0, 100.0),
        ("plant.relief_bar", p.relief_bar, 1.0, 10.0),
        ("plant.temp_floor_k", p.temp_floor_k, 1.0, 200.0),
        ("plant.temp_ceiling_k", p.temp_ceiling_k, 1.0, 2000.0),
        ("plant.mdot_floor_kg_s", p.mdot_floor_kg_s, POSITIVE, 1.0),
        ("plant.sub_volume_l", p.sub_volume_l, POSITIVE, 1e4),
        ("plant.sub_fill_lps", p.sub_fill_lps, 0.0, 100.0),
        ("plant.sub_base_cons_lps", p.sub_base_cons_lps, 0.0, 100.0),
        ("plant.sub_cons_lps_per_w", p.sub_cons_lps_per_w, 0.0, 1.0),
        ("plant.sub_vent_cons_lps_per_lpm", p.sub_vent_cons_lps_per_lpm, 0.0, 1.0),
        ("plant.hv_refill_pctps", p.hv_refill_pctps, 0.0, 100.0),
        ("plant.hv_loop_vent_drain_pctps", p.hv_loop_vent_drain_pctps, 0.0, 100.0),
        ("plant.hv_base_cons_pctps", p.hv_base_cons_pctps, 0.0, 100.0),
        ("plant.hv_power_cons_pctps_per_w", p.hv_power_cons_pctps_per_w, 0.0, 1.0),
        ("plant.hv_heater_cons_pctps", p.hv_heater_cons_pctps, 0.0, 100.0),
        ("plant.hv_vent_cons_pctps", p.hv_vent_cons_pctps, 0.0, 100.0),
    ];
    for (key, value, min, max) in rates {
        range(key, value, min, max)?;
    }
    order(
        "plant.temp_ceiling_k",
        p.temp_floor_k < p.temp_ceiling_k,
        "must exceed plant.temp_floor_k",
    )?;
    order(
        "plant.ambient_k",
        p.temp_floor_k <= p.ambient_k && p.ambient_k <= p.temp_ceiling_k,
        "must lie between the temperature floor and ceiling",
    )
}

fn validate_thresholds(prefix: &str, th: &RefillThresholds) -> Checked {
    range(&format!("{prefix}.arm_below_pct"), th.arm_below_pct, 0.0, 100.0)?;
    range(&format!("{prefix}.disarm_above_pct"), th.disarm_above_pct, 0.0, 100.0)?;
    range(&format!("{prefix}.target_pct"), th.target_pct, 0.0, 100.0)?;
    order(
        prefix,
        th.arm_below_pct <= th.disarm_above_pct && th.disarm_above_pct < th.target_pct,
        "expected arm_below_pct <= disarm_above_pct < target_pct",
    )
}

fn validate_sequencer(config: &TwinConfig) -> Checked {
    let s = &config.sequencer;
    let max_hz = config.plant.pump_max_hz;
    let relief = config.plant.relief_bar;
    let fields = [
        ("sequencer.cooldown_pump_min_hz", s.cooldown_pump_min_hz, 0.0, max_hz),
        ("sequencer.cooldown_throttle", s.cooldown_throttle, 0.0, 1.0),
        ("sequencer.warmup_pump_min_hz", s.warmup_pump_min_hz, 0.0, max_hz),
        ("sequencer.warmup_throttle", s.warmup_throttle, 0.0, 1.0),
        ("sequencer.loop_close_k", s.loop_close_k, 1.0, 400.0),
        ("sequencer.vent_mid_above_k", s.vent_mid_above_k, 1.0, 400.0),
        ("sequencer.vent_full_opening", s.vent_full_opening, 0.0, 1.0),
        ("sequencer.vent_mid_opening", s.vent_mid_opening, 0.0, 1.0),
        ("sequencer.vent_hv_refill_min", s.vent_hv_refill_min, 0.0, 1.0),
        ("sequencer.warmup_vent_opening", s.warmup_vent_opening, 0.0, 1.0),
        ("sequencer.pulse_period_s", s.pulse_period_s, 0.01, 3600.0),
        ("sequencer.purge_open_max_bar", s.purge_open_max_bar, 1.0, relief),
        ("sequencer.warmup_done_margin_k", s.warmup_done_margin_k, 0.0, 50.0),
        (
            "sequencer.readiness.hv_pressure_tol_bar",
            s.readiness.hv_pressure_tol_bar,
            POSITIVE,
            5.0,
        ),
        (
            "sequencer.readiness.loop_pressure_tol_bar",
            s.readiness.loop_pressure_tol_bar,
            POSITIVE,
            5.0,
        ),
        (
            "sequencer.readiness.min_hv_level_pct",
            s.readiness.min_hv_level_pct,
            0.0,
            100.0,
        ),
        (
            "sequencer.readiness.max_supply_temp_k",
            s.readiness.max_supply_temp_k,
            1.0,
            400.0,
        ),
    ];
    for (key, value, min, max) in fields {
        range(key, value, min, max)?;
    }
    order(
        "sequencer.vent_mid_above_k",
        s.vent_mid_above_k < s.loop_close_k,
        "must be below sequencer.loop_close_k",
    )?;
    validate_thresholds("sequencer.hv_refill", &s.hv_refill)?;
    validate_thresholds("sequencer.sub_refill", &s.sub_refill)
}

fn validate_interlock(limits: &InterlockLimits) -> Checked {
    range("interlock.rise_window_s", limits.rise_window_s, POSITIVE, 60.0)?;
    range("interlock.min_flow_lpm", limits.min_flow_lpm, 0.0, 100.0)?;
    range(
        "interlock.low_flow_alarm_after_s",
        limits.low_flow_alarm_after_s,
        0.0,
        3600.0,
    )?;
    range(
        "interlock.debounce_samples",
        f64::from(limits.debounce_samples),
        1.0,
        100.0,
    )?;
    // Per-channel escalation order is owned by the evaluator.
    limits
        .validate()
        .map_err(|err| ValidationError::InvalidOrder {
            key: "interlock".to_string(),
            reason: err.to_string(),
        })
}

fn validate_operating(config: &TwinConfig) -> Checked {
    let o = &config.operating;
    range("operating.init_s", o.init_s, 0.0, 3600.0)?;
    range("operating.precool_target_k", o.precool_target_k, 1.0, 400.0)?;
    range("operating.precool_band_k", o.precool_band_k, 0.0, 100.0)?;
    range("operating.warmup_off_margin_k", o.warmup_off_margin_k, 0.0, 100.0)
}

fn validate_initial(config: &TwinConfig) -> Checked {
    let s = &config.initial.state;
    let c = &config.initial.controls;
    let relief = config.plant.relief_bar;
    let fields = [
        ("initial.state.supply_temp_k", s.supply_temp_k, 0.0, 2000.0),
        ("initial.state.return_temp_k", s.return_temp_k, 0.0, 2000.0),
        ("initial.state.loop_pressure_bar", s.loop_pressure_bar, 0.0, relief),
        ("initial.state.hv_pressure_bar", s.hv_pressure_bar, 0.0, relief),
        ("initial.state.sub_level_pct", s.sub_level_pct, 0.0, 100.0),
        ("initial.state.hv_level_pct", s.hv_level_pct, 0.0, 100.0),
        ("initial.state.flow_lpm", s.flow_lpm, 0.0, 1000.0),
        ("initial.controls.throttle", c.throttle, 0.0, 1.0),
        ("initial.controls.loop_vent", c.loop_vent, 0.0, 1.0),
        ("initial.controls.hv_vent", c.hv_vent, 0.0, 1.0),
        ("initial.controls.pump_hz", c.pump_hz, 0.0, config.plant.pump_max_hz),
        ("initial.controls.press_sp_bar", c.press_sp_bar, 0.0, relief),
        ("initial.controls.heater_u", c.heater_u, 0.0, 1.0),
    ];
    for (key, value, min, max) in fields {
        range(key, value, min, max)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&TwinConfig::default()), Ok(()));
    }

    #[test]
    fn nan_is_out_of_range() {
        let mut config = TwinConfig::default();
        config.plant.kc_per_s = f64::NAN;
        match validate_config(&config) {
            Err(ValidationError::OutOfRange { key, .. }) => assert_eq!(key, "plant.kc_per_s"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pump_limit_follows_plant() {
        let mut config = TwinConfig::default();
        config.plant.pump_max_hz = 50.0;
        config.initial.controls.pump_hz = 60.0;
        match validate_config(&config) {
            Err(ValidationError::OutOfRange { key, max, .. }) => {
                assert_eq!(key, "initial.controls.pump_hz");
                assert_eq!(max, 50.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn version_zero_and_future_rejected() {
        for version in [0, LATEST_VERSION + 1] {
            let config = TwinConfig {
                version,
                ..TwinConfig::default()
            };
            assert!(matches!(
                validate_config(&config),
                Err(ValidationError::UnsupportedVersion { .. })
            ));
        }
    }
}
