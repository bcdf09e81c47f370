use crate::CoreError;

/// Floating point type used for masses, times and rates.
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Fixed-point text with `digits` decimals, as shown on readouts.
pub fn format_fixed(v: Real, digits: usize) -> String {
    format!("{v:.digits$}")
}

/// Convert a seconds value entered by an operator into whole milliseconds.
pub fn seconds_to_millis(seconds: Real) -> Result<u64, CoreError> {
    let seconds = ensure_finite(seconds, "seconds")?;
    if seconds < 0.0 {
        return Err(CoreError::InvalidArg {
            what: "seconds must not be negative",
        });
    }
    Ok((seconds * 1000.0).round() as u64)
}
