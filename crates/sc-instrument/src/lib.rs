//! Serial link to a laboratory balance.
//!
//! The balance speaks a two-byte command protocol (escape + letter) and
//! answers weight polls with a single ASCII line. This crate provides:
//! - the wire protocol (command encoding and response parsing)
//! - [`InstrumentLink`], a blocking request/response link over any byte stream
//! - serial port settings, opening and discovery
//! - [`SimulatedBalance`] for running without hardware
//!
//! The link never retries. Retry and skip policy belongs to the caller.

pub mod error;
pub mod link;
pub mod port;
pub mod protocol;
pub mod simulated;

pub use error::{LinkError, LinkResult};
pub use link::{Instrument, InstrumentLink, Transport};
pub use port::{
    DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT, PortInfo, PortSettings, SerialLink,
    available_ports, default_port_name, open,
};
pub use protocol::{Command, ESCAPE, MAX_LINE_LEN, parse_weight};
pub use simulated::SimulatedBalance;
