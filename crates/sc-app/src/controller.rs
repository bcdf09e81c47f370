//! Run lifecycle: start, tick, stop.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use sc_core::{Clock, InvariantViolation, MonotonicClock};
use sc_instrument::{Instrument, LinkError, LinkResult};
use sc_monitor::{
    AlertSink, ClockStatus, FlowRateCalculator, LogAlertSink, SampleClock,
    ThresholdAlerter,
};
use sc_series::{
    ChartView, ExportPaths, ExportResult, Sample, SeriesStore, Snapshot, write_export,
};

use crate::config::{ConfigResult, RunConfig};
use crate::error::AppResult;
use crate::events::{Readout, TickConsumer, TickReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// A tick whose read failed. The run carries on.
#[derive(Debug)]
pub struct TickFailure {
    pub tick: u64,
    pub elapsed_seconds: f64,
    pub error: LinkError,
}

#[derive(Debug)]
pub enum TickOutcome {
    /// Not running; nothing was read.
    Idle,
    Sampled(TickReport),
    Failed(TickFailure),
}

/// Owns every piece of run state and drives one acquisition timeline.
///
/// Instrument reads and series writes only happen while `Running`. After
/// `stop` the series stays frozen for export until the next `start`.
pub struct RunController {
    instrument: Box<dyn Instrument>,
    clock: SampleClock,
    store: SeriesStore,
    flow: FlowRateCalculator,
    alerter: ThresholdAlerter,
    chart: ChartView,
    config: RunConfig,
    alert_sink: Box<dyn AlertSink>,
    consumers: Vec<Box<dyn TickConsumer>>,
    tick_failures: u64,
}

impl RunController {
    pub fn new(instrument: Box<dyn Instrument>, config: RunConfig) -> ConfigResult<Self> {
        Self::with_clock(instrument, Box::new(MonotonicClock), config)
    }

    pub fn with_clock(
        instrument: Box<dyn Instrument>,
        clock: Box<dyn Clock>,
        config: RunConfig,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            instrument,
            clock: SampleClock::new(clock),
            store: SeriesStore::new(),
            flow: FlowRateCalculator::new(),
            alerter: ThresholdAlerter::new(),
            chart: ChartView::new(config.plot_title.clone()),
            config,
            alert_sink: Box::new(LogAlertSink),
            consumers: Vec::new(),
            tick_failures: 0,
        })
    }

    pub fn with_alert_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.alert_sink = sink;
        self
    }

    /// Register a consumer for every successful tick's report.
    pub fn subscribe(&mut self, consumer: Box<dyn TickConsumer>) {
        self.consumers.push(consumer);
    }

    pub fn state(&self) -> RunState {
        if self.clock.is_active() {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Replace the run settings. Takes effect from the next tick; an
    /// interval change applies after the tick already scheduled.
    pub fn update_config(&mut self, config: RunConfig) -> ConfigResult<()> {
        config.validate()?;
        self.clock.set_config(config.sample_config()?);
        self.chart.set_title(config.plot_title.clone());
        self.config = config;
        debug!(config = ?self.config, "run config updated");
        Ok(())
    }

    /// Tare, reset the series if the last run recorded anything, re-arm the
    /// alert and start the clock.
    ///
    /// A failed tare aborts the start and leaves the previous series intact.
    pub fn start(&mut self) -> AppResult<StartOutcome> {
        if self.clock.is_active() {
            info!("run already in progress; start ignored");
            return Ok(StartOutcome::AlreadyRunning);
        }
        let sample_config = self.config.sample_config()?;

        if let Err(e) = self.instrument.tare() {
            warn!(error = %e, "tare failed; run not started");
            return Err(e.into());
        }

        if self.store.has_data() {
            self.store.reset();
        }
        self.alerter.arm();
        self.tick_failures = 0;

        let status = self.clock.start(sample_config);
        debug_assert_eq!(status, ClockStatus::Started);
        info!(
            interval_ms = self.config.sampling_interval_ms,
            "run started; timer is ON"
        );
        Ok(StartOutcome::Started)
    }

    /// Stop the clock and freeze the series. Returns false if already idle.
    pub fn stop(&mut self) -> bool {
        match self.clock.stop() {
            ClockStatus::Stopped => {
                info!(
                    samples = self.store.len(),
                    tick_failures = self.tick_failures,
                    elapsed_s = self.clock.elapsed_seconds(),
                    "run stopped; timer is OFF"
                );
                true
            }
            _ => false,
        }
    }

    /// Zero the balance outside of `start`.
    pub fn tare(&mut self) -> LinkResult<()> {
        self.instrument.tare()?;
        info!("balance tared");
        Ok(())
    }

    pub fn is_due(&self) -> bool {
        self.clock.is_due()
    }

    pub fn time_until_tick(&self) -> Option<Duration> {
        self.clock.time_until_tick()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.clock.elapsed_seconds()
    }

    /// One acquisition cycle: read, append, derive, alert, publish.
    ///
    /// A failed read skips the sample and is counted; the run continues.
    /// An `Err` means a broken invariant and the run must not continue.
    pub fn on_tick(&mut self) -> Result<TickOutcome, InvariantViolation> {
        if !self.clock.is_active() {
            return Ok(TickOutcome::Idle);
        }

        let reading = self.instrument.read_mass();
        let elapsed_seconds = self.clock.elapsed_seconds();
        self.clock.mark_ticked();
        let tick = self.clock.ticks();

        let mass_grams = match reading {
            Ok(mass) => mass,
            Err(error) => {
                self.tick_failures += 1;
                warn!(
                    tick,
                    elapsed_s = elapsed_seconds,
                    failures = self.tick_failures,
                    error = %error,
                    "tick failed; sample skipped"
                );
                return Ok(TickOutcome::Failed(TickFailure {
                    tick,
                    elapsed_seconds,
                    error,
                }));
            }
        };

        let sample = Sample::new(elapsed_seconds, mass_grams);
        self.store.append(sample)?;
        let flow_rate = self.flow.compute(&sample)?;

        let alert = self
            .alerter
            .check(&sample, &self.config.alert_settings());
        if let Some(event) = &alert {
            self.alert_sink.alert(event);
        }

        let report = TickReport {
            tick,
            sample,
            flow_rate,
            readout: Readout::new(&sample, &flow_rate),
            snapshot: self.store.snapshot(),
            alert,
        };
        debug!(tick, elapsed_s = elapsed_seconds, mass_g = mass_grams, "tick");
        for consumer in &mut self.consumers {
            consumer.on_tick(&report);
        }
        Ok(TickOutcome::Sampled(report))
    }

    pub fn tick_failures(&self) -> u64 {
        self.tick_failures
    }

    pub fn series(&self) -> &SeriesStore {
        &self.store
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Write `<base>.txt` and `<base>.svg` from the current series.
    pub fn export(&self, base: &Path) -> ExportResult<ExportPaths> {
        let snapshot = self.snapshot();
        let frame = self.chart.render(&snapshot);
        write_export(base, &snapshot, &frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_core::ManualClock;
    use std::collections::VecDeque;

    struct FakeBalance {
        masses: VecDeque<LinkResult<f64>>,
        fail_tare: bool,
    }

    impl Instrument for FakeBalance {
        fn tare(&mut self) -> LinkResult<()> {
            if self.fail_tare {
                Err(LinkError::Timeout { timeout_ms: 10 })
            } else {
                Ok(())
            }
        }

        fn read_mass(&mut self) -> LinkResult<f64> {
            self.masses
                .pop_front()
                .unwrap_or(Err(LinkError::Timeout { timeout_ms: 10 }))
        }
    }

    fn controller(masses: Vec<f64>) -> (RunController, ManualClock) {
        let time = ManualClock::new();
        let balance = FakeBalance {
            masses: masses.into_iter().map(Ok).collect(),
            fail_tare: false,
        };
        let controller =
            RunController::with_clock(Box::new(balance), Box::new(time.clone()), RunConfig::default())
                .unwrap();
        (controller, time)
    }

    #[test]
    fn tick_while_idle_reads_nothing() {
        let (mut c, _) = controller(vec![1.0]);
        assert!(matches!(c.on_tick().unwrap(), TickOutcome::Idle));
        assert_eq!(c.series().len(), 1);
    }

    #[test]
    fn tick_appends_and_derives_flow() {
        let (mut c, time) = controller(vec![1.0]);
        c.start().unwrap();
        time.advance_millis(60_000);

        match c.on_tick().unwrap() {
            TickOutcome::Sampled(report) => {
                assert_eq!(report.sample, Sample::new(60.0, 1.0));
                assert_eq!(report.flow_rate.ul_per_min, 1000.0);
                assert_eq!(report.snapshot.len(), 2);
                assert_eq!(report.readout.flow_rate, "1000.00 uL/min");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn failed_tare_does_not_start() {
        let time = ManualClock::new();
        let balance = FakeBalance {
            masses: VecDeque::new(),
            fail_tare: true,
        };
        let mut c =
            RunController::with_clock(Box::new(balance), Box::new(time), RunConfig::default())
                .unwrap();

        assert!(c.start().is_err());
        assert_eq!(c.state(), RunState::Idle);
    }

    #[test]
    fn config_update_rejects_tiny_interval() {
        let (mut c, _) = controller(vec![]);
        let bad = RunConfig {
            sampling_interval_ms: 1,
            ..RunConfig::default()
        };
        assert!(c.update_config(bad).is_err());
        assert_eq!(c.config().sampling_interval_ms, 1000);
    }
}
