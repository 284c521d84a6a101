//! FTDI D2XX vendor USB capability set and enumeration backend.
//!
//! Last driver in the probe order, compiled in with the `d2xx` feature.
//! Claims the names `FTDI` (first adapter), `FTDI<n>` (adapter by index)
//! or the serial number of a detected adapter. Also backs
//! [`crate::enumerate`], which is the only place adapter discovery is
//! exposed.

use std::io;
use std::time::Duration;

use libftd2xx::{list_devices, Ftdi, FtdiCommon};

use crate::driver::{BusDriver, BusPort, MiscOperation, READ_TIMEOUT_MS};
use crate::enumerate::BusDeviceInfo;
use crate::error::{Error, Result};

fn status_err(status: libftd2xx::FtStatus) -> io::Error {
    io::Error::other(format!("d2xx: {status:?}"))
}

/// Built-in FTDI D2XX transport driver.
pub struct D2xxDriver;

impl BusDriver for D2xxDriver {
    fn name(&self) -> &'static str {
        "d2xx"
    }

    fn open(&self, device_name: &str, baud_rate: u32) -> io::Result<Box<dyn BusPort>> {
        let mut ft = open_adapter(device_name)?;
        ft.set_baud_rate(baud_rate).map_err(status_err)?;
        ft.set_timeouts(
            Duration::from_millis(READ_TIMEOUT_MS),
            Duration::from_millis(READ_TIMEOUT_MS),
        )
        .map_err(status_err)?;
        Ok(Box::new(D2xxBusPort { ft }))
    }
}

fn open_adapter(device_name: &str) -> io::Result<Ftdi> {
    if device_name == "FTDI" {
        return Ftdi::new().map_err(status_err);
    }
    if let Some(index) = device_name
        .strip_prefix("FTDI")
        .and_then(|s| s.parse::<i32>().ok())
    {
        return Ftdi::with_index(index).map_err(status_err);
    }

    // otherwise the name must be the serial number of a detected adapter
    let known = list_devices().map_err(status_err)?;
    if known.iter().any(|d| d.serial_number == device_name) {
        return Ftdi::with_serial_number(device_name).map_err(status_err);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "not a d2xx adapter name",
    ))
}

struct D2xxBusPort {
    ft: Ftdi,
}

// FT_HANDLEs may be used from any thread per the vendor programming
// guide; the port is still driven by one owner at a time.
unsafe impl Send for D2xxBusPort {}

impl BusPort for D2xxBusPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ft.read(buf).map_err(status_err)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ft.write(buf).map_err(status_err)
    }

    fn misc_operation(&mut self, op: MiscOperation) -> io::Result<()> {
        match op {
            MiscOperation::PurgeRx => self.ft.purge_rx().map_err(status_err),
            MiscOperation::FlushTx => self.ft.purge_tx().map_err(status_err),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.ft.close().map_err(status_err)
    }
}

/// Number of adapters the vendor library currently sees.
pub(crate) fn detected_bus_count() -> usize {
    list_devices().map(|devices| devices.len()).unwrap_or(0)
}

/// Descriptor for the adapter at `index` in the vendor library's list.
pub(crate) fn bus_device_details(index: usize) -> Result<BusDeviceInfo> {
    let devices = list_devices().map_err(|s| Error::Io(status_err(s)))?;
    let device = devices.get(index).ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no adapter at index {index}"),
        ))
    })?;
    Ok(BusDeviceInfo {
        device_name: device.serial_number.clone(),
        description: device.description.clone(),
        serial_number: device.serial_number.clone(),
        in_use: device.port_open,
    })
}
