//! Error types for the sc-app service layer.

use sc_instrument::LinkError;
use sc_series::ExportError;

use crate::config::ConfigError;

/// Operator-facing error. Every variant is recoverable: the front end shows
/// the message and carries on.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Instrument error: {0}")]
    Link(#[from] LinkError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Failed to start acquisition worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Acquisition worker is not running")]
    WorkerGone,

    #[error("Acquisition worker panicked")]
    WorkerPanicked,
}

/// Result type for sc-app operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failure_keeps_the_os_reason() {
        let err = AppError::Spawn(std::io::Error::other("thread limit reached"));
        assert_eq!(
            err.to_string(),
            "Failed to start acquisition worker: thread limit reached"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
