//! Append-only sample series for the current run.

use std::sync::Arc;

use sc_core::InvariantViolation;

use crate::export::format_series;
use crate::sample::{SEED_SAMPLE, Sample};

/// Immutable point-in-time copy of the series.
pub type Snapshot = Arc<[Sample]>;

/// Ordered samples of one run, always starting with [`SEED_SAMPLE`].
///
/// Times are strictly increasing. Readers on other threads get a
/// [`Snapshot`], never a reference to the live vector.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    samples: Vec<Sample>,
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesStore {
    pub fn new() -> Self {
        Self {
            samples: vec![SEED_SAMPLE],
        }
    }

    /// Drop everything and reseed.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.samples.push(SEED_SAMPLE);
    }

    pub fn append(&mut self, sample: Sample) -> Result<(), InvariantViolation> {
        let last = self.last();
        if !sample.elapsed_seconds.is_finite() || sample.elapsed_seconds <= last.elapsed_seconds {
            return Err(InvariantViolation::new(
                "sample times must strictly increase",
                format!(
                    "appending t={} after t={}",
                    sample.elapsed_seconds, last.elapsed_seconds
                ),
            ));
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn last(&self) -> Sample {
        // The seed is never removed, so there is always a last sample.
        self.samples[self.samples.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True once anything beyond the seed has been recorded.
    pub fn has_data(&self) -> bool {
        self.samples.len() > 1
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn snapshot(&self) -> Snapshot {
        Arc::from(self.samples.as_slice())
    }

    /// Tab-separated `elapsed\tmass` lines in insertion order.
    pub fn format(&self) -> String {
        format_series(&self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_store_holds_only_the_seed() {
        let store = SeriesStore::new();
        assert_eq!(&*store.snapshot(), &[Sample::new(0.01, 0.0)]);
        assert!(!store.has_data());
    }

    #[test]
    fn reset_reseeds() {
        let mut store = SeriesStore::new();
        store.append(Sample::new(1.0, 0.2)).unwrap();
        store.append(Sample::new(2.0, 0.4)).unwrap();
        assert!(store.has_data());

        store.reset();
        assert_eq!(&*store.snapshot(), &[SEED_SAMPLE]);
    }

    #[test]
    fn append_rejects_equal_or_earlier_times() {
        let mut store = SeriesStore::new();
        store.append(Sample::new(1.0, 0.1)).unwrap();

        let err = store.append(Sample::new(1.0, 0.2)).unwrap_err();
        assert!(format!("{err}").contains("strictly increase"));
        assert!(store.append(Sample::new(0.5, 0.2)).is_err());
        assert!(store.append(Sample::new(f64::NAN, 0.2)).is_err());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn append_before_seed_time_is_rejected() {
        let mut store = SeriesStore::new();
        assert!(store.append(Sample::new(0.005, 0.0)).is_err());
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut store = SeriesStore::new();
        store.append(Sample::new(1.0, 0.1)).unwrap();
        let snap = store.snapshot();

        store.append(Sample::new(2.0, 0.2)).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(store.len(), 3);
    }

    proptest! {
        #[test]
        fn accepted_series_is_strictly_increasing(
            times in prop::collection::vec(0.0_f64..100.0, 1..50)
        ) {
            let mut store = SeriesStore::new();
            for t in times {
                let _ = store.append(Sample::new(t, 1.0));
            }
            let snap = store.snapshot();
            for pair in snap.windows(2) {
                prop_assert!(pair[1].elapsed_seconds > pair[0].elapsed_seconds);
            }
        }
    }
}
