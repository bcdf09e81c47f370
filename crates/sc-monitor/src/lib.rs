//! Sampling and derived-metric primitives for the acquisition loop.
//!
//! # Architecture
//!
//! - [`SampleClock`] decides when a tick is due and measures run time
//! - [`FlowRateCalculator`] turns the latest sample into a flow rate
//! - [`ThresholdAlerter`] latches a one-shot alert per run
//!
//! None of these touch the instrument or the series; the run controller
//! wires them together on each tick.

pub mod alert;
pub mod clock;
pub mod error;
pub mod flow;

pub use alert::{AlertEvent, AlertSettings, AlertSink, AlertState, LogAlertSink, ThresholdAlerter};
pub use clock::{ClockStatus, SampleClock, SampleConfig};
pub use error::{MonitorError, MonitorResult};
pub use flow::{FlowRate, FlowRateCalculator, MICROLITRES_PER_GRAM};
