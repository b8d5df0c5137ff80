//! Heater-vessel pressure controller.
//!
//! Positional PI with a clamped integrator:
//! - integrator held in `[0, 1]`
//! - output clamped to `[0, 1]`
//! - anti-windup: the integrator does not move further into saturation

use serde::{Deserialize, Serialize};

/// PI gains for the heater loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeaterController {
    /// Proportional gain (1/bar).
    pub kp: f64,
    /// Integral gain (1/(bar s)).
    pub ki: f64,
}

impl HeaterController {
    pub fn new(kp: f64, ki: f64) -> Self {
        Self { kp, ki }
    }

    /// Compute the heater output for one tick.
    ///
    /// # Arguments
    ///
    /// * `integral` - Integrator state from the previous tick
    /// * `pv` - Heater-vessel pressure (bar)
    /// * `sp` - Pressure setpoint (bar)
    /// * `dt` - Tick length (seconds)
    ///
    /// # Returns
    ///
    /// Updated integrator and output, both in `[0, 1]`.
    pub fn update(&self, integral: f64, pv: f64, sp: f64, dt: f64) -> (f64, f64) {
        let error = sp - pv;
        let p_term = self.kp * error;
        let candidate = (integral + self.ki * error * dt).clamp(0.0, 1.0);

        let raw = p_term + candidate;
        let output = raw.clamp(0.0, 1.0);

        // Saturated in the direction the error pushes: keep the old integrator.
        let winding_up = (raw > 1.0 && error > 0.0) || (raw < 0.0 && error < 0.0);
        let integral = if winding_up {
            integral.clamp(0.0, 1.0)
        } else {
            candidate
        };
        (integral, output)
    }
}
