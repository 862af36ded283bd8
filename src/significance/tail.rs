//! Standard-normal tail probabilities on a log scale.

use statrs::distribution::{ContinuousCDF, Normal};

/// Beyond this |z| the survival function underflows towards zero and the
/// asymptotic expansion takes over.
const ASYMPTOTIC_THRESHOLD: f64 = 30.0;

/// Natural log of P(Z > x) for the standard normal.
#[inline]
pub(crate) fn ln_upper_tail(normal: &Normal, x: f64) -> f64 {
    if x > ASYMPTOTIC_THRESHOLD {
        return log_normal_tail_asymptotic(x);
    }
    normal.sf(x).ln()
}

/// Mills-ratio expansion of log(P(Z > x)) for large positive x.
#[inline]
fn log_normal_tail_asymptotic(x: f64) -> f64 {
    let x_sq = x * x;
    let correction = 1.0 - 1.0 / x_sq + 3.0 / (x_sq * x_sq);
    -0.5 * x_sq - (x * (2.0 * std::f64::consts::PI).sqrt()).ln() + correction.ln()
}

/// log10 of the two-sided tail probability P(|Z| >= |z|).
#[inline]
pub(crate) fn log10_two_sided(normal: &Normal, z: f64) -> f64 {
    let ln_p = std::f64::consts::LN_2 + ln_upper_tail(normal, z.abs());
    ln_p.min(0.0) / std::f64::consts::LN_10
}
