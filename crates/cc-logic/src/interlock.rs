//! Safety interlock evaluation.
//!
//! Every sample classifies each channel against its warning/alarm/critical limits.
//! Warning and alarm only take effect after `debounce_samples` consecutive
//! non-normal samples; critical takes effect at once. The verdict is the maximum
//! over channels.
//!
//! A critical verdict latches. The latch clears once it has been acknowledged and two
//! consecutive evaluations after the acknowledgement have found every channel normal.
//! An acknowledgement given while the condition persists is kept.

use cc_sim::{Controls, State};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

use crate::error::{LogicError, LogicResult};

/// Consecutive all-normal evaluations needed to clear an acknowledged latch.
const LATCH_CLEAR_SAMPLES: u32 = 2;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Alarm,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "NORMAL",
            Severity::Warning => "WARNING",
            Severity::Alarm => "ALARM",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warning/alarm/critical bounds for one channel. `None` disables that level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelLimits {
    pub warning: Option<f64>,
    pub alarm: Option<f64>,
    pub critical: Option<f64>,
}

impl LevelLimits {
    pub const fn new(warning: f64, alarm: f64, critical: f64) -> Self {
        Self {
            warning: Some(warning),
            alarm: Some(alarm),
            critical: Some(critical),
        }
    }

    /// Highest level whose bound `value` meets or exceeds.
    pub fn classify_high(&self, value: f64) -> Severity {
        self.classify(|bound| value >= bound)
    }

    /// Highest level whose bound `value` meets or falls below.
    pub fn classify_low(&self, value: f64) -> Severity {
        self.classify(|bound| value <= bound)
    }

    fn classify(&self, hit: impl Fn(f64) -> bool) -> Severity {
        if self.critical.is_some_and(&hit) {
            Severity::Critical
        } else if self.alarm.is_some_and(&hit) {
            Severity::Alarm
        } else if self.warning.is_some_and(&hit) {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    /// Bounds must escalate monotonically: rising for high limits, falling for low.
    fn validate(&self, channel: &'static str, rising: bool) -> LogicResult<()> {
        let bounds: Vec<f64> = [self.warning, self.alarm, self.critical]
            .into_iter()
            .flatten()
            .collect();
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(LogicError::InvalidLimits {
                channel,
                reason: "limits must be finite",
            });
        }
        let ordered = bounds
            .windows(2)
            .all(|w| if rising { w[0] <= w[1] } else { w[0] >= w[1] });
        if !ordered {
            return Err(LogicError::InvalidLimits {
                channel,
                reason: "limits must escalate from warning to critical",
            });
        }
        Ok(())
    }
}

/// Interlock channels, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    ReturnTempHigh,
    SupplyTempLow,
    LoopPressureHigh,
    HvPressureHigh,
    LoopPressureLow,
    LoopPressureRise,
    LowFlow,
    HvLevelLow,
    SubLevelLow,
}

impl Channel {
    pub const ALL: [Channel; 9] = [
        Channel::ReturnTempHigh,
        Channel::SupplyTempLow,
        Channel::LoopPressureHigh,
        Channel::HvPressureHigh,
        Channel::LoopPressureLow,
        Channel::LoopPressureRise,
        Channel::LowFlow,
        Channel::HvLevelLow,
        Channel::SubLevelLow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::ReturnTempHigh => "return_temp_high",
            Channel::SupplyTempLow => "supply_temp_low",
            Channel::LoopPressureHigh => "loop_pressure_high",
            Channel::HvPressureHigh => "hv_pressure_high",
            Channel::LoopPressureLow => "loop_pressure_low",
            Channel::LoopPressureRise => "loop_pressure_rise",
            Channel::LowFlow => "low_flow",
            Channel::HvLevelLow => "hv_level_low",
            Channel::SubLevelLow => "sub_level_low",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterlockLimits {
    /// T6 (K).
    pub return_temp_high_k: LevelLimits,
    /// T5 (K).
    pub supply_temp_low_k: LevelLimits,
    /// Applied to PT1 and PT3 (bar).
    pub pressure_high_bar: LevelLimits,
    /// PT1 (bar).
    pub loop_pressure_low_bar: LevelLimits,
    /// PT1 rise rate over `rise_window_s` (bar/s).
    pub pressure_rise_bar_per_s: LevelLimits,
    pub rise_window_s: f64,
    /// FT18 floor while the loop is commanded (L/min).
    pub min_flow_lpm: f64,
    /// Low flow escalates from warning to alarm after this long (s).
    pub low_flow_alarm_after_s: f64,
    /// LT23 (%).
    pub hv_level_low_pct: LevelLimits,
    /// LT19 (%).
    pub sub_level_low_pct: LevelLimits,
    /// Consecutive samples before a warning or alarm takes effect.
    pub debounce_samples: u32,
}

impl Default for InterlockLimits {
    fn default() -> Self {
        Self {
            return_temp_high_k: LevelLimits::new(285.0, 295.0, 310.0),
            supply_temp_low_k: LevelLimits::new(76.0, 74.0, 70.0),
            pressure_high_bar: LevelLimits::new(3.5, 4.0, 4.4),
            loop_pressure_low_bar: LevelLimits::new(0.8, 0.5, 0.2),
            pressure_rise_bar_per_s: LevelLimits::new(2.0, 3.5, 5.0),
            rise_window_s: 1.0,
            min_flow_lpm: 0.5,
            low_flow_alarm_after_s: 5.0,
            hv_level_low_pct: LevelLimits {
                warning: Some(15.0),
                alarm: Some(10.0),
                critical: None,
            },
            sub_level_low_pct: LevelLimits {
                warning: Some(15.0),
                alarm: Some(10.0),
                critical: None,
            },
            debounce_samples: 2,
        }
    }
}

impl InterlockLimits {
    pub fn validate(&self) -> LogicResult<()> {
        self.return_temp_high_k.validate("return_temp_high_k", true)?;
        self.supply_temp_low_k.validate("supply_temp_low_k", false)?;
        self.pressure_high_bar.validate("pressure_high_bar", true)?;
        self.loop_pressure_low_bar.validate("loop_pressure_low_bar", false)?;
        self.pressure_rise_bar_per_s.validate("pressure_rise_bar_per_s", true)?;
        self.hv_level_low_pct.validate("hv_level_low_pct", false)?;
        self.sub_level_low_pct.validate("sub_level_low_pct", false)?;
        if !(self.rise_window_s.is_finite() && self.rise_window_s > 0.0) {
            return Err(LogicError::InvalidArg {
                what: "rise_window_s must be positive",
            });
        }
        if !(self.low_flow_alarm_after_s.is_finite() && self.low_flow_alarm_after_s >= 0.0) {
            return Err(LogicError::InvalidArg {
                what: "low_flow_alarm_after_s must be non-negative",
            });
        }
        if self.debounce_samples == 0 {
            return Err(LogicError::InvalidArg {
                what: "debounce_samples must be at least 1",
            });
        }
        Ok(())
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterlockVerdict {
    /// Maximum effective severity; `Critical` while latched.
    pub severity: Severity,
    pub latched: bool,
    /// Effective (debounced) severity per channel, in [`Channel::ALL`] order.
    pub channels: [Severity; 9],
}

impl InterlockVerdict {
    pub fn channel(&self, channel: Channel) -> Severity {
        self.channels[channel.index()]
    }

    /// A critical verdict demands a safe shutdown.
    pub fn forces_safe_shutdown(&self) -> bool {
        self.severity == Severity::Critical
    }
}

#[derive(Debug, Clone)]
pub struct InterlockEvaluator {
    limits: InterlockLimits,
    counters: [u32; 9],
    /// (time, PT1) samples inside the rise window.
    history: VecDeque<(f64, f64)>,
    clock_s: f64,
    low_flow_s: f64,
    latched: bool,
    acknowledged: bool,
    clear_streak: u32,
    verdict: InterlockVerdict,
}

impl InterlockEvaluator {
    pub fn new(limits: InterlockLimits) -> LogicResult<Self> {
        limits.validate()?;
        Ok(Self {
            limits,
            counters: [0; 9],
            history: VecDeque::new(),
            clock_s: 0.0,
            low_flow_s: 0.0,
            latched: false,
            acknowledged: false,
            clear_streak: 0,
            verdict: InterlockVerdict::default(),
        })
    }

    pub fn limits(&self) -> &InterlockLimits {
        &self.limits
    }

    pub fn verdict(&self) -> &InterlockVerdict {
        &self.verdict
    }

    pub fn severity(&self) -> Severity {
        self.verdict.severity
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Operator acknowledgement of the critical latch.
    pub fn acknowledge(&mut self) {
        if self.latched {
            debug!("critical latch acknowledged");
            self.acknowledged = true;
            self.clear_streak = 0;
        }
    }

    /// Forget counters, history, timers and the latch.
    pub fn reset(&mut self) {
        self.counters = [0; 9];
        self.history.clear();
        self.clock_s = 0.0;
        self.low_flow_s = 0.0;
        self.latched = false;
        self.acknowledged = false;
        self.clear_streak = 0;
        self.verdict = InterlockVerdict::default();
    }

    /// Classify one sample. `dt` advances the rise window and the low-flow timer.
    pub fn evaluate(&mut self, state: &State, controls: &Controls, dt: f64) -> &InterlockVerdict {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock_s += dt;

        let raw = self.classify(state, controls, dt);
        let mut channels = [Severity::Normal; 9];
        for channel in Channel::ALL {
            let i = channel.index();
            let severity = raw[i];
            channels[i] = if severity == Severity::Normal {
                self.counters[i] = 0;
                Severity::Normal
            } else {
                self.counters[i] = self.counters[i].saturating_add(1);
                if severity == Severity::Critical
                    || self.counters[i] >= self.limits.debounce_samples
                {
                    severity
                } else {
                    Severity::Normal
                }
            };
        }

        let worst = channels.iter().copied().max().unwrap_or_default();
        if worst != self.verdict.severity && worst > Severity::Normal {
            let culprits: Vec<&str> = Channel::ALL
                .iter()
                .filter(|c| channels[c.index()] == worst)
                .map(|c| c.as_str())
                .collect();
            warn!(severity = %worst, channels = ?culprits, "interlock severity changed");
        }

        if worst == Severity::Critical {
            if !self.latched {
                warn!("critical interlock latched");
                self.latched = true;
                self.acknowledged = false;
            }
            self.clear_streak = 0;
        } else if self.latched {
            let all_normal = raw.iter().all(|&s| s == Severity::Normal);
            self.clear_streak = if all_normal { self.clear_streak + 1 } else { 0 };
            if self.acknowledged && self.clear_streak >= LATCH_CLEAR_SAMPLES {
                debug!("critical latch cleared");
                self.latched = false;
                self.acknowledged = false;
                self.clear_streak = 0;
            }
        }

        self.verdict = InterlockVerdict {
            severity: if self.latched { Severity::Critical } else { worst },
            latched: self.latched,
            channels,
        };
        &self.verdict
    }

    /// Undebounced per-channel severity for one sample.
    fn classify(&mut self, state: &State, controls: &Controls, dt: f64) -> [Severity; 9] {
        let l = &self.limits;
        let mut raw = [Severity::Normal; 9];

        raw[Channel::ReturnTempHigh.index()] = l.return_temp_high_k.classify_high(state.return_temp_k);
        raw[Channel::SupplyTempLow.index()] = l.supply_temp_low_k.classify_low(state.supply_temp_k);
        raw[Channel::LoopPressureHigh.index()] =
            l.pressure_high_bar.classify_high(state.loop_pressure_bar);
        raw[Channel::HvPressureHigh.index()] = l.pressure_high_bar.classify_high(state.hv_pressure_bar);
        raw[Channel::LoopPressureLow.index()] =
            l.loop_pressure_low_bar.classify_low(state.loop_pressure_bar);
        raw[Channel::HvLevelLow.index()] = l.hv_level_low_pct.classify_low(state.hv_level_pct);
        raw[Channel::SubLevelLow.index()] = l.sub_level_low_pct.classify_low(state.sub_level_pct);

        let rise = self.rise_rate(state.loop_pressure_bar);
        raw[Channel::LoopPressureRise.index()] = self.limits.pressure_rise_bar_per_s.classify_high(rise);

        let commanded = controls.supply_open && controls.return_open && controls.pump_running();
        raw[Channel::LowFlow.index()] = if commanded && state.flow_lpm < self.limits.min_flow_lpm {
            self.low_flow_s += dt;
            if self.low_flow_s >= self.limits.low_flow_alarm_after_s {
                Severity::Alarm
            } else {
                Severity::Warning
            }
        } else {
            self.low_flow_s = 0.0;
            Severity::Normal
        };
        raw
    }

    /// PT1 rise rate (bar/s) across the sliding window. Falling pressure reads as 0.
    fn rise_rate(&mut self, pressure_bar: f64) -> f64 {
        let now = self.clock_s;
        // Samples taken without the clock advancing replace each other.
        match self.history.back_mut() {
            Some(last) if last.0 >= now => *last = (now, pressure_bar),
            _ => self.history.push_back((now, pressure_bar)),
        }
        let horizon = now - self.limits.rise_window_s - 1e-9;
        while self.history.front().is_some_and(|&(t, _)| t < horizon) {
            self.history.pop_front();
        }
        match self.history.front() {
            Some(&(t0, p0)) if now - t0 > 1e-9 => ((pressure_bar - p0) / (now - t0)).max(0.0),
            _ => 0.0,
        }
    }
}
