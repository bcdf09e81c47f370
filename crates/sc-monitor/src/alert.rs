//! One-shot mass threshold alert.
//!
//! The alerter starts every run `Armed` and moves to `Fired` the first time
//! an enabled threshold is exceeded. Only the next run re-arms it.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sc_series::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Armed,
    Fired,
}

/// Operator alert settings, read fresh on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertSettings {
    pub enabled: bool,
    pub threshold_grams: f64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_grams: 0.1,
        }
    }
}

/// Emitted once when the latched threshold is crossed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvent {
    pub sample: Sample,
    pub threshold_grams: f64,
}

/// Receiver of the alert side effect (beep, dialog, log line).
pub trait AlertSink: Send {
    fn alert(&mut self, event: &AlertEvent);
}

impl<F: FnMut(&AlertEvent) + Send> AlertSink for F {
    fn alert(&mut self, event: &AlertEvent) {
        self(event)
    }
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn alert(&mut self, event: &AlertEvent) {
        warn!(
            mass_g = event.sample.mass_grams,
            threshold_g = event.threshold_grams,
            elapsed_s = event.sample.elapsed_seconds,
            "target weight reached"
        );
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdAlerter {
    state: AlertState,
}

impl Default for ThresholdAlerter {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdAlerter {
    pub fn new() -> Self {
        Self {
            state: AlertState::Armed,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Re-arm for a new run.
    pub fn arm(&mut self) {
        self.state = AlertState::Armed;
    }

    /// Check the latest sample; returns the event on the single transition.
    pub fn check(&mut self, latest: &Sample, settings: &AlertSettings) -> Option<AlertEvent> {
        if self.state == AlertState::Fired || !settings.enabled {
            return None;
        }
        if latest.mass_grams > settings.threshold_grams {
            self.state = AlertState::Fired;
            info!(
                mass_g = latest.mass_grams,
                threshold_g = settings.threshold_grams,
                "threshold alert fired"
            );
            return Some(AlertEvent {
                sample: *latest,
                threshold_grams: settings.threshold_grams,
            });
        }
        None
    }
}
