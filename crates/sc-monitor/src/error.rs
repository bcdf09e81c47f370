//! Error types for sampling configuration.

use thiserror::Error;

pub type MonitorResult<T> = Result<T, MonitorError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MonitorError {
    /// Invalid argument provided to a sampling primitive.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
