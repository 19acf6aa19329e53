//! The easing curve used to animate goal changes.

/// Interpolates from `a` to `b` with progress `t` raised to the power `p`.
///
/// Callers are expected to keep `t` within `[0, 1]`. With `p > 1` this is an
/// ease-in curve.
pub fn interpolate(a: f64, b: f64, t: f64, p: f64) -> f64 {
    (b - a) * t.powf(p) + a
}
