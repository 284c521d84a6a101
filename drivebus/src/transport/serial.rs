//! Serial port capability set.
//!
//! First driver in the probe order. Claims device names that look like
//! serial ports: `COM*` on Windows, absolute `/dev/*` paths, or bare
//! `tty*` basenames. Ports are opened 8N1 at the baud rate the probe
//! supplies, with a bounded read timeout so a quiet bus produces a short
//! read instead of a hang.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

use crate::driver::{BusDriver, BusPort, MiscOperation, READ_TIMEOUT_MS};

/// Built-in serial transport driver.
pub struct SerialDriver;

/// Whether `name` follows this driver's device-name convention.
pub(crate) fn matches_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("com") || name.starts_with("/dev/") || lower.starts_with("tty")
}

impl BusDriver for SerialDriver {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn open(&self, device_name: &str, baud_rate: u32) -> io::Result<Box<dyn BusPort>> {
        if !matches_name(device_name) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "not a serial port name",
            ));
        }

        let port = serialport::new(device_name, baud_rate)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()
            .map_err(io::Error::from)?;
        Ok(Box::new(SerialBusPort { port }))
    }
}

struct SerialBusPort {
    port: Box<dyn SerialPort>,
}

impl BusPort for SerialBusPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            // a quiet bus is a short read, not an error
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn misc_operation(&mut self, op: MiscOperation) -> io::Result<()> {
        match op {
            MiscOperation::PurgeRx => self
                .port
                .clear(ClearBuffer::Input)
                .map_err(io::Error::from),
            MiscOperation::FlushTx => self.port.flush(),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        // dropping the port releases the descriptor
        Ok(())
    }
}
