//! A balance that fills at a constant rate.

use sc_core::{Clock, MonotonicClock};
use std::time::Instant;
use tracing::debug;

use crate::error::{LinkError, LinkResult};
use crate::link::Instrument;

/// Stand-in for real hardware: gross mass grows linearly with time and tare
/// zeroes whatever has accumulated so far.
///
/// With `with_dropout(n)` every `n`-th poll times out, which exercises the
/// skipped-tick path of the sampler.
pub struct SimulatedBalance {
    clock: Box<dyn Clock>,
    origin: Instant,
    grams_per_second: f64,
    tare_offset: f64,
    dropout_every: Option<u32>,
    polls: u32,
}

impl SimulatedBalance {
    pub fn new(grams_per_second: f64) -> Self {
        Self::with_clock(grams_per_second, Box::new(MonotonicClock))
    }

    pub fn with_clock(grams_per_second: f64, clock: Box<dyn Clock>) -> Self {
        let origin = clock.now();
        Self {
            clock,
            origin,
            grams_per_second,
            tare_offset: 0.0,
            dropout_every: None,
            polls: 0,
        }
    }

    pub fn with_dropout(mut self, every: u32) -> Self {
        self.dropout_every = (every > 0).then_some(every);
        self
    }

    fn gross(&self) -> f64 {
        let elapsed = self.clock.now().saturating_duration_since(self.origin);
        self.grams_per_second * elapsed.as_secs_f64()
    }
}

impl Instrument for SimulatedBalance {
    fn tare(&mut self) -> LinkResult<()> {
        self.tare_offset = self.gross();
        debug!(offset = self.tare_offset, "simulated tare");
        Ok(())
    }

    fn read_mass(&mut self) -> LinkResult<f64> {
        self.polls += 1;
        if let Some(every) = self.dropout_every
            && self.polls % every == 0
        {
            return Err(LinkError::Timeout { timeout_ms: 0 });
        }
        // Four decimals, like a 0.1 mg balance.
        let net = self.gross() - self.tare_offset;
        Ok((net * 10_000.0).round() / 10_000.0)
    }
}
