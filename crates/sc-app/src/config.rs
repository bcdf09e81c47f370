//! Operator configuration: link settings and per-run settings.
//!
//! Values can come from a YAML file, from command-line flags, or from text
//! typed by the operator while a run is in progress.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sc_instrument::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT, PortSettings, default_port_name};
use sc_monitor::{AlertSettings, MonitorError, SampleConfig};
use sc_series::DEFAULT_PLOT_TITLE;

/// Smallest sampling interval. Keeps the first real sample after the
/// 0.01 s seed sample.
pub const MIN_SAMPLING_INTERVAL_MS: u64 = 20;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} is not a number: {text:?}")]
    InvalidNumber { field: &'static str, text: String },

    #[error("{field} out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        reason: String,
    },

    #[error("Invalid sampling setting: {0}")]
    Sampling(#[from] MonitorError),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Settings the operator may change between or during runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub sampling_interval_ms: u64,
    pub plot_title: String,
    pub alert_enabled: bool,
    pub alert_threshold_grams: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        let alert = AlertSettings::default();
        Self {
            sampling_interval_ms: SampleConfig::default().interval_ms,
            plot_title: DEFAULT_PLOT_TITLE.to_string(),
            alert_enabled: alert.enabled,
            alert_threshold_grams: alert.threshold_grams,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.sample_config()?;
        if self.sampling_interval_ms < MIN_SAMPLING_INTERVAL_MS {
            return Err(ConfigError::OutOfRange {
                field: "sampling interval",
                reason: format!(
                    "{} ms is below the {MIN_SAMPLING_INTERVAL_MS} ms minimum",
                    self.sampling_interval_ms
                ),
            });
        }
        if !self.alert_threshold_grams.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "alert threshold",
                reason: "must be finite".to_string(),
            });
        }
        Ok(())
    }

    pub fn sample_config(&self) -> ConfigResult<SampleConfig> {
        Ok(SampleConfig::new(self.sampling_interval_ms)?)
    }

    pub fn alert_settings(&self) -> AlertSettings {
        AlertSettings {
            enabled: self.alert_enabled,
            threshold_grams: self.alert_threshold_grams,
        }
    }

    /// Apply an interval typed in seconds.
    pub fn set_interval_text(&mut self, text: &str) -> ConfigResult<()> {
        self.sampling_interval_ms = parse_interval_seconds(text)?;
        Ok(())
    }

    /// Apply a threshold typed in grams.
    pub fn set_threshold_text(&mut self, text: &str) -> ConfigResult<()> {
        self.alert_threshold_grams = parse_threshold_grams(text)?;
        Ok(())
    }
}

/// Where the balance is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: default_port_name().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
        }
    }
}

impl LinkConfig {
    pub fn port_settings(&self) -> PortSettings {
        PortSettings::new(self.port.clone())
            .with_baud_rate(self.baud_rate)
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub link: LinkConfig,
    pub run: RunConfig,
}

pub fn parse_config(text: &str) -> ConfigResult<AppConfig> {
    let config: AppConfig = serde_yaml::from_str(text)?;
    config.run.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> ConfigResult<AppConfig> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

/// Parse a sampling interval typed in seconds into milliseconds.
pub fn parse_interval_seconds(text: &str) -> ConfigResult<u64> {
    let seconds = parse_number("sampling interval", text)?;
    let ms = sc_core::seconds_to_millis(seconds).map_err(|e| ConfigError::OutOfRange {
        field: "sampling interval",
        reason: e.to_string(),
    })?;
    if ms < MIN_SAMPLING_INTERVAL_MS {
        return Err(ConfigError::OutOfRange {
            field: "sampling interval",
            reason: format!("{seconds} s is below the {MIN_SAMPLING_INTERVAL_MS} ms minimum"),
        });
    }
    Ok(ms)
}

/// Parse an alert threshold typed in grams.
pub fn parse_threshold_grams(text: &str) -> ConfigResult<f64> {
    parse_number("alert threshold", text)
}

fn parse_number(field: &'static str, text: &str) -> ConfigResult<f64> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ConfigError::InvalidNumber {
            field,
            text: text.to_string(),
        }),
    }
}
