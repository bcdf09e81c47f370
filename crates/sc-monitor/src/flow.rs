//! Overall flow rate from accumulated mass.

use std::fmt;

use sc_core::{InvariantViolation, format_fixed};
use sc_series::Sample;

/// Volume per gram of collected liquid, assuming water density.
pub const MICROLITRES_PER_GRAM: f64 = 1000.0;

/// Flow rate in microlitres per minute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowRate {
    pub ul_per_min: f64,
}

impl FlowRate {
    /// Two-decimal readout, e.g. `"1000.00 uL/min"`.
    pub fn display(&self) -> String {
        format!("{} uL/min", format_fixed(self.ul_per_min, 2))
    }
}

impl fmt::Display for FlowRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Average flow since the start of the run: everything collected so far
/// divided by the time taken to collect it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowRateCalculator;

impl FlowRateCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, latest: &Sample) -> Result<FlowRate, InvariantViolation> {
        if latest.elapsed_seconds <= 0.0 || !latest.elapsed_seconds.is_finite() {
            return Err(InvariantViolation::new(
                "flow rate needs positive elapsed time",
                format!("elapsed_seconds = {}", latest.elapsed_seconds),
            ));
        }
        let microlitres = latest.mass_grams * MICROLITRES_PER_GRAM;
        let minutes = latest.elapsed_seconds / 60.0;
        Ok(FlowRate {
            ul_per_min: microlitres / minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_series::SEED_SAMPLE;

    #[test]
    fn one_gram_per_minute_is_a_thousand_microlitres() {
        let rate = FlowRateCalculator::new()
            .compute(&Sample::new(60.0, 1.0))
            .unwrap();
        assert_eq!(rate.ul_per_min, 1000.0);
        assert_eq!(rate.display(), "1000.00 uL/min");
    }

    #[test]
    fn seed_sample_gives_zero_flow() {
        let rate = FlowRateCalculator::new().compute(&SEED_SAMPLE).unwrap();
        assert_eq!(rate.ul_per_min, 0.0);
    }

    #[test]
    fn readout_rounds_to_two_decimals() {
        let rate = FlowRateCalculator::new()
            .compute(&Sample::new(7.0, 0.0123))
            .unwrap();
        assert!((rate.ul_per_min - 105.428_571).abs() < 1e-5);
        assert_eq!(rate.to_string(), "105.43 uL/min");
    }

    #[test]
    fn zero_elapsed_is_an_invariant_breach() {
        let err = FlowRateCalculator::new()
            .compute(&Sample::new(0.0, 1.0))
            .unwrap_err();
        assert!(err.what.contains("positive elapsed"));
    }
}
