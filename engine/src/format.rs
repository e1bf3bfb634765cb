//! Display rounding. Output of these functions is for people, never for further math.

/// Fixed-point rendering; non-finite values show as `-`.
pub fn format_fixed(v: f64, digits: usize) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    // keep -0 from leaking into the output
    let v = if v == 0.0 { 0.0 } else { v };
    format!("{v:.digits$}")
}

/// Renders an input value the way it was entered, for substituted expressions.
pub(crate) fn num(v: f64) -> String {
    format!("{v}")
}
