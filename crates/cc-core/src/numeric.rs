use crate::CoreError;

/// Floating point type used throughout the twin
pub type Real = f64;

/// Divisor floor for flow- and time-constant-driven divisions.
pub const DIV_FLOOR: Real = 1e-6;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Check `lo <= v <= hi` (and finiteness).
pub fn ensure_in_range(v: Real, lo: Real, hi: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v < lo || v > hi {
        return Err(CoreError::OutOfRange {
            what,
            value: v,
            min: lo,
            max: hi,
        });
    }
    Ok(v)
}

/// Clamp to `[lo, hi]`, mapping NaN to `lo`.
#[inline]
pub fn clamp_or_floor(v: Real, lo: Real, hi: Real) -> Real {
    if v.is_nan() { lo } else { v.clamp(lo, hi) }
}

/// Clamp a valve opening or controller output to `[0, 1]`. NaN reads as closed.
#[inline]
pub fn clamp_unit(v: Real) -> Real {
    clamp_or_floor(v, 0.0, 1.0)
}

/// Clamp a level percentage to `[0, 100]`.
#[inline]
pub fn clamp_pct(v: Real) -> Real {
    clamp_or_floor(v, 0.0, 100.0)
}

/// Clamp to `[0, inf)`, mapping NaN to zero.
#[inline]
pub fn clamp_non_negative(v: Real) -> Real {
    if v.is_nan() { 0.0 } else { v.max(0.0) }
}

/// First-order relaxation of `current` toward `target` over `dt` with time constant `tau`.
///
/// The step fraction is capped at 1 so a tick longer than `tau` lands on the
/// target instead of overshooting it.
#[inline]
pub fn relax(current: Real, target: Real, dt: Real, tau: Real) -> Real {
    let frac = (dt / tau.max(DIV_FLOOR)).clamp(0.0, 1.0);
    current + (target - current) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_in_range_reports_bounds() {
        assert!(ensure_in_range(0.5, 0.0, 1.0, "x").is_ok());
        let err = ensure_in_range(2.0, 0.0, 1.0, "x").unwrap_err();
        assert_eq!(
            err,
            CoreError::OutOfRange {
                what: "x",
                value: 2.0,
                min: 0.0,
                max: 1.0
            }
        );
    }

    #[test]
    fn clamp_unit_handles_nan() {
        assert_eq!(clamp_unit(Real::NAN), 0.0);
        assert_eq!(clamp_unit(-0.5), 0.0);
        assert_eq!(clamp_unit(1.5), 1.0);
    }

    #[test]
    fn relax_never_overshoots() {
        assert_eq!(relax(280.0, 80.0, 10.0, 1.0), 80.0);
        let half = relax(0.0, 10.0, 1.0, 2.0);
        assert!((half - 5.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn relax_stays_between_endpoints(
            current in -500.0_f64..500.0,
            target in -500.0_f64..500.0,
            dt in 0.0_f64..100.0,
            tau in 0.0_f64..1000.0,
        ) {
            let next = relax(current, target, dt, tau);
            let lo = current.min(target) - 1e-9;
            let hi = current.max(target) + 1e-9;
            prop_assert!(next >= lo && next <= hi);
        }

        #[test]
        fn clamp_pct_in_domain(v in proptest::num::f64::ANY) {
            let c = clamp_pct(v);
            prop_assert!((0.0..=100.0).contains(&c));
        }
    }
}
