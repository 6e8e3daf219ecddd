//! Ceiling clamp and exponential easing shared by the rate estimators

/// Move `current` toward `min(raw, ceiling)` by `factor`.
///
/// Formula: `current + (min(raw, ceiling) - current) * factor`
///
/// With `current` in `[0, ceiling]`, a non-negative `raw` and `factor` in
/// `(0, 1]`, the result stays in `[0, ceiling]`.
pub fn ease_toward(current: f64, raw: f64, ceiling: f64, factor: f64) -> f64 {
    let target = raw.max(0.0).min(ceiling);
    let eased = current + (target - current) * factor;
    eased.clamp(0.0, ceiling)
}

/// Round to one decimal, matching the displayed precision
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
