//! Sample data type.

use serde::{Deserialize, Serialize};

/// One balance reading, stamped with time since the run started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub elapsed_seconds: f64,
    pub mass_grams: f64,
}

/// First point of every run. Its non-zero time keeps rate computations
/// away from a zero divisor.
pub const SEED_SAMPLE: Sample = Sample::new(0.01, 0.0);

impl Sample {
    pub const fn new(elapsed_seconds: f64, mass_grams: f64) -> Self {
        Self {
            elapsed_seconds,
            mass_grams,
        }
    }
}
