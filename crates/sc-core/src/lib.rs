//! sc-core: shared foundation for autoscale.
//!
//! Contains:
//! - numeric (Real + float helpers)
//! - timing (monotonic clock abstraction used by the sample clock)
//! - error (shared error types, including the invariant breach type)

pub mod error;
pub mod numeric;
pub mod timing;

pub use error::{CoreError, CoreResult, InvariantViolation};
pub use numeric::*;
pub use timing::{Clock, ManualClock, MonotonicClock};
