//! Run orchestration for the balance sampler.
//!
//! This crate ties the instrument link, sample clock, series store and
//! derived metrics into one run lifecycle, and provides a worker thread
//! that drives it on a single acquisition timeline for any front end.

pub mod acquisition;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;

pub use acquisition::{Acquisition, Command};
pub use config::{
    AppConfig, ConfigError, ConfigResult, LinkConfig, MIN_SAMPLING_INTERVAL_MS, RunConfig,
    load_config, parse_config, parse_interval_seconds, parse_threshold_grams,
};
pub use controller::{RunController, RunState, StartOutcome, TickFailure, TickOutcome};
pub use error::{AppError, AppResult};
pub use events::{Readout, RunEvent, SnapshotSlot, TickConsumer, TickReport};
