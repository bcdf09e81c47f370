//! Error types for instrument communication.

use std::io;
use std::time::Duration;
use thiserror::Error;

pub type LinkResult<T> = Result<T, LinkError>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),

    #[error("Serial I/O failure: {0}")]
    Io(#[source] io::Error),

    #[error("Instrument did not answer within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Malformed instrument response: {line:?}")]
    MalformedResponse { line: String },
}

impl LinkError {
    /// Classify an I/O error from the transport, splitting out read timeouts.
    pub fn from_io(err: io::Error, read_timeout: Duration) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => LinkError::Timeout {
                timeout_ms: read_timeout.as_millis() as u64,
            },
            _ => LinkError::Io(err),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_io_becomes_timeout() {
        let err = LinkError::from_io(
            io::Error::new(io::ErrorKind::TimedOut, "no answer"),
            Duration::from_millis(1500),
        );
        assert!(err.is_timeout());
        assert_eq!(format!("{err}"), "Instrument did not answer within 1500 ms");
    }

    #[test]
    fn other_io_stays_io() {
        let err = LinkError::from_io(
            io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"),
            Duration::from_secs(1),
        );
        assert!(matches!(err, LinkError::Io(_)));
    }
}
