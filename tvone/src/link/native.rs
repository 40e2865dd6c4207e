//! Serial port implementation of [`Link`].

use crate::error::{Error, Result};
use crate::link::Link;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// Baud rate the unit ships configured for.
pub const DEFAULT_BAUD: u32 = 57600;

/// Read timeout on the underlying port.
///
/// Short on purpose: the engine polls [`Link::byte_ready`] before every read,
/// so this only bounds the pathological case of a byte vanishing in between.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Serial port link.
pub struct NativeLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl NativeLink {
    /// Open a serial port at the given baud rate (8 data bits, no parity,
    /// one stop bit, no flow control — the unit's fixed line settings).
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }

    /// List available serial ports.
    pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>> {
        serialport::available_ports().map_err(Error::Serial)
    }

    /// Get the underlying serial port.
    pub fn inner(&self) -> &dyn serialport::SerialPort {
        self.port.as_ref()
    }

    /// Get mutable access to the underlying serial port.
    pub fn inner_mut(&mut self) -> &mut dyn serialport::SerialPort {
        self.port.as_mut()
    }
}

impl Link for NativeLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn byte_ready(&mut self) -> Result<bool> {
        Ok(self.port.bytes_to_read()? > 0)
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(1) => Ok(buf[0]),
            Ok(_) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "read_byte: no data",
            ))),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn clear_input(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
