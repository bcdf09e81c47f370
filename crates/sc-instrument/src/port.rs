//! Serial port settings, opening and discovery.

use std::io;
use std::time::Duration;

use serialport::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits,
};
use tracing::info;

use crate::error::{LinkError, LinkResult};
use crate::link::{InstrumentLink, Transport};

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Bounded read timeout so a silent balance cannot stall the sampler forever.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2000);

/// Link over an opened OS serial port.
pub type SerialLink = InstrumentLink<Box<dyn SerialPort>>;

impl Transport for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Port identifier used when none is configured.
pub fn default_port_name() -> &'static str {
    if cfg!(windows) { "COM1" } else { "/dev/ttyUSB0" }
}

/// Where and how fast to talk to the balance.
///
/// Framing is fixed at 7 data bits, no parity, one stop bit.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSettings {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            port: default_port_name().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl PortSettings {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Open the configured serial port as a balance link.
pub fn open(settings: &PortSettings) -> LinkResult<SerialLink> {
    let port = serialport::new(&settings.port, settings.baud_rate)
        .data_bits(DataBits::Seven)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(settings.read_timeout)
        .open()
        .map_err(|source| LinkError::Open {
            port: settings.port.clone(),
            source,
        })?;

    info!(
        port = %settings.port,
        baud = settings.baud_rate,
        "serial link open"
    );
    Ok(InstrumentLink::new(port, settings.read_timeout))
}

/// A serial port found on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

pub fn available_ports() -> LinkResult<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(LinkError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|p| PortInfo {
            description: describe(&p.port_type),
            name: p.port_name,
        })
        .collect())
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => match (&usb.manufacturer, &usb.product) {
            (Some(m), Some(p)) => format!("USB {m} {p}"),
            (None, Some(p)) => format!("USB {p}"),
            _ => format!("USB {:04x}:{:04x}", usb.vid, usb.pid),
        },
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}
