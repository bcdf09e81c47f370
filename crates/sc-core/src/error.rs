use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

/// A broken internal invariant.
///
/// Raised when the acquisition core observes a state that correct code can
/// never produce (non-monotonic sample times, zero elapsed time in a rate
/// computation). It is not an operator-facing error.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invariant violated: {what} ({detail})")]
pub struct InvariantViolation {
    pub what: &'static str,
    pub detail: String,
}

impl InvariantViolation {
    pub fn new(what: &'static str, detail: impl Into<String>) -> Self {
        Self {
            what,
            detail: detail.into(),
        }
    }
}
