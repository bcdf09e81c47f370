//! What the run publishes to front ends.

use std::sync::{Arc, Mutex};

use sc_monitor::{AlertEvent, FlowRate};
use sc_series::{ExportPaths, Sample, Snapshot};

use crate::controller::RunState;

/// Text for the "last data point" and flow rate labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    pub last_point: String,
    pub flow_rate: String,
}

impl Readout {
    pub fn new(sample: &Sample, flow: &FlowRate) -> Self {
        Self {
            last_point: format!(
                "last data point: {:?} sec, {} g",
                sample.elapsed_seconds, sample.mass_grams
            ),
            flow_rate: flow.display(),
        }
    }
}

/// Everything produced by one successful tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub sample: Sample,
    pub flow_rate: FlowRate,
    pub readout: Readout,
    pub snapshot: Snapshot,
    pub alert: Option<AlertEvent>,
}

/// Registered with the controller to receive each tick's report.
pub trait TickConsumer: Send {
    fn on_tick(&mut self, report: &TickReport);
}

impl<F: FnMut(&TickReport) + Send> TickConsumer for F {
    fn on_tick(&mut self, report: &TickReport) {
        self(report)
    }
}

/// Holds the most recent report for readers polling at their own pace,
/// e.g. a redraw loop.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSlot {
    latest: Arc<Mutex<Option<TickReport>>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<TickReport> {
        match self.latest.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        self.store(None);
    }

    fn store(&self, report: Option<TickReport>) {
        match self.latest.lock() {
            Ok(mut guard) => *guard = report,
            Err(poisoned) => *poisoned.into_inner() = report,
        }
    }
}

impl TickConsumer for SnapshotSlot {
    fn on_tick(&mut self, report: &TickReport) {
        self.store(Some(report.clone()));
    }
}

/// Events sent from the acquisition worker to the front end.
#[derive(Debug, Clone)]
pub enum RunEvent {
    StateChanged(RunState),
    /// Start ignored because a run is in progress.
    AlreadyRunning,
    StartFailed { message: String },
    Tick(Box<TickReport>),
    TickFailed {
        tick: u64,
        elapsed_seconds: f64,
        message: String,
    },
    Alert(AlertEvent),
    Tared,
    TareFailed { message: String },
    ConfigUpdated,
    ConfigRejected { message: String },
    Exported(ExportPaths),
    ExportFailed { message: String },
    /// The run hit a broken invariant and was stopped.
    Aborted { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_series::SeriesStore;

    fn report(tick: u64) -> TickReport {
        let sample = Sample::new(2.0, 0.05);
        let flow_rate = FlowRate { ul_per_min: 1500.0 };
        TickReport {
            tick,
            sample,
            flow_rate,
            readout: Readout::new(&sample, &flow_rate),
            snapshot: SeriesStore::new().snapshot(),
            alert: None,
        }
    }

    #[test]
    fn readout_text() {
        let r = report(1).readout;
        assert_eq!(r.last_point, "last data point: 2.0 sec, 0.05 g");
        assert_eq!(r.flow_rate, "1500.00 uL/min");
    }

    #[test]
    fn slot_keeps_only_latest() {
        let mut slot = SnapshotSlot::new();
        let reader = slot.clone();
        assert!(reader.latest().is_none());

        slot.on_tick(&report(1));
        slot.on_tick(&report(2));
        assert_eq!(reader.latest().unwrap().tick, 2);

        reader.clear();
        assert!(slot.latest().is_none());
    }
}
