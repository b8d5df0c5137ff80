//! Square-wave timer for the toggled heater-vessel vent (V20).
//!
//! The timer only runs while enabled. The first enabled tick starts the wave in the
//! closed half; every `period` seconds after that the phase flips. Disabling clears
//! both the accumulated time and the phase, so the next run starts closed again.

use serde::{Deserialize, Serialize};

/// Slack on the period comparison so `n * dt` sums that land a rounding error
/// short of the period still toggle on time.
const PERIOD_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseTimer {
    /// Half-period of the square wave (seconds).
    pub period_s: f64,
    elapsed_s: f64,
    open: bool,
    running: bool,
}

impl Default for PulseTimer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PulseTimer {
    pub fn new(period_s: f64) -> Self {
        Self {
            period_s,
            elapsed_s: 0.0,
            open: false,
            running: false,
        }
    }

    /// Advance one tick and return the vent opening (0 or 1).
    pub fn update(&mut self, dt: f64, enabled: bool) -> f64 {
        if !enabled {
            self.reset();
            return 0.0;
        }
        if !self.running {
            self.running = true;
            self.elapsed_s = 0.0;
            self.open = false;
        } else {
            self.elapsed_s += dt.max(0.0);
            if self.elapsed_s + PERIOD_SLACK >= self.period_s {
                self.open = !self.open;
                self.elapsed_s = (self.elapsed_s - self.period_s).max(0.0);
            }
        }
        self.output()
    }

    pub fn reset(&mut self) {
        self.elapsed_s = 0.0;
        self.open = false;
        self.running = false;
    }

    /// Whether the wave is running this tick (independent of its phase).
    pub fn is_active(&self) -> bool {
        self.running
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn output(&self) -> f64 {
        if self.open { 1.0 } else { 0.0 }
    }
}
