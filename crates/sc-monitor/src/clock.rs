//! Periodic sample clock.
//!
//! The clock does not own a thread. The acquisition loop asks it when the
//! next tick is due, runs the tick, then calls [`SampleClock::mark_ticked`].
//! Run time is measured from the monotonic [`Clock`] it was built with.

use std::fmt;
use std::time::{Duration, Instant};

use sc_core::{Clock, MonotonicClock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MonitorError, MonitorResult};

/// Sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Interval between ticks in milliseconds.
    pub interval_ms: u64,
}

impl SampleConfig {
    /// Create a new sample configuration.
    ///
    /// # Arguments
    ///
    /// * `interval_ms` - Tick interval in milliseconds (must be positive)
    pub fn new(interval_ms: u64) -> MonitorResult<Self> {
        if interval_ms == 0 {
            return Err(MonitorError::InvalidArg {
                what: "sampling interval must be positive",
            });
        }
        Ok(Self { interval_ms })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

/// Outcome of a start or stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    Started,
    /// Start while running: the existing schedule is kept.
    AlreadyActive,
    Stopped,
    AlreadyIdle,
}

enum Phase {
    Idle,
    Active { started: Instant, next_tick: Instant },
}

pub struct SampleClock {
    clock: Box<dyn Clock>,
    config: SampleConfig,
    phase: Phase,
    /// Run time at the last stop; reported while idle.
    frozen: Duration,
    ticks: u64,
}

impl fmt::Debug for SampleClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleClock")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .field("elapsed", &self.elapsed())
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl Default for SampleClock {
    fn default() -> Self {
        Self::new(Box::new(MonotonicClock))
    }
}

impl SampleClock {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            config: SampleConfig::default(),
            phase: Phase::Idle,
            frozen: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Start ticking every `config.interval_ms`, timing from zero.
    ///
    /// A second start while active is a no-op.
    pub fn start(&mut self, config: SampleConfig) -> ClockStatus {
        if self.is_active() {
            warn!("sample clock is already active; start ignored");
            return ClockStatus::AlreadyActive;
        }
        let now = self.clock.now();
        self.config = config;
        self.frozen = Duration::ZERO;
        self.ticks = 0;
        self.phase = Phase::Active {
            started: now,
            next_tick: now + config.interval(),
        };
        debug!(interval_ms = config.interval_ms, "sample clock started");
        ClockStatus::Started
    }

    /// Stop ticking and freeze the run time.
    pub fn stop(&mut self) -> ClockStatus {
        match self.phase {
            Phase::Idle => ClockStatus::AlreadyIdle,
            Phase::Active { started, .. } => {
                self.frozen = self.clock.now().saturating_duration_since(started);
                self.phase = Phase::Idle;
                debug!(ticks = self.ticks, "sample clock stopped");
                ClockStatus::Stopped
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active { .. })
    }

    pub fn config(&self) -> SampleConfig {
        self.config
    }

    /// Change the interval. The tick already scheduled keeps its time; the
    /// new interval applies from the one after it.
    pub fn set_config(&mut self, config: SampleConfig) {
        self.config = config;
    }

    /// Time since the last start; frozen while idle.
    pub fn elapsed(&self) -> Duration {
        match self.phase {
            Phase::Idle => self.frozen,
            Phase::Active { started, .. } => self.clock.now().saturating_duration_since(started),
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// True when active and the scheduled tick time has been reached.
    pub fn is_due(&self) -> bool {
        match self.phase {
            Phase::Idle => false,
            Phase::Active { next_tick, .. } => self.clock.now() >= next_tick,
        }
    }

    /// Wait until the next tick, or `None` when idle.
    pub fn time_until_tick(&self) -> Option<Duration> {
        match self.phase {
            Phase::Idle => None,
            Phase::Active { next_tick, .. } => {
                Some(next_tick.saturating_duration_since(self.clock.now()))
            }
        }
    }

    /// Schedule the next tick after one has run.
    ///
    /// Ticks missed because the previous one overran are dropped, not
    /// replayed in a burst.
    pub fn mark_ticked(&mut self) {
        let now = self.clock.now();
        let interval = self.config.interval();
        if let Phase::Active { next_tick, .. } = &mut self.phase {
            self.ticks += 1;
            *next_tick += interval;
            if *next_tick <= now {
                let behind = now.saturating_duration_since(*next_tick);
                debug!(?behind, "tick overran its interval; skipping missed ticks");
                *next_tick = now + interval;
            }
        }
    }

    /// Ticks run since the last start.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
