//! Driver selection and the open sequence.
//!
//! Opening a device name nobody has described is a probing problem: each
//! built-in driver gets one attempt, in a fixed priority order, and the
//! first one that claims the name and opens it wins. Callers with their
//! own transport skip the probe entirely and pass a driver to
//! [`BusRegistry::open_with_driver`].

use crate::driver::{BusDriver, MiscOperation};
use crate::error::{Error, Result};
use crate::registry::{BusHandle, BusRegistry};
use crate::tracing::prelude::*;

/// Built-in drivers in probe priority order: serial, then TCP, then the
/// vendor USB adapter when compiled in.
///
/// Empty when the `built-in-drivers` feature is off, in which case
/// [`BusRegistry::open`] always fails with [`Error::NoBuiltinDrivers`].
pub fn builtin_drivers() -> Vec<&'static dyn BusDriver> {
    #[allow(unused_mut)]
    let mut drivers: Vec<&'static dyn BusDriver> = Vec::new();
    #[cfg(feature = "built-in-drivers")]
    {
        drivers.push(&crate::transport::serial::SerialDriver);
        drivers.push(&crate::transport::tcp::TcpDriver);
    }
    #[cfg(all(feature = "built-in-drivers", feature = "d2xx"))]
    drivers.push(&crate::transport::d2xx::D2xxDriver);
    drivers
}

impl BusRegistry {
    /// Open `device_name` by probing the built-in drivers.
    ///
    /// Names like `/dev/ttyUSB0` or `COM3` land on the serial driver,
    /// `host:port` on TCP, adapter serials on the vendor driver. Returns
    /// the first handle a driver produces; [`Error::NoDriverMatched`] when
    /// every driver declined or failed.
    pub fn open(&mut self, device_name: &str) -> Result<BusHandle> {
        let drivers = builtin_drivers();
        if drivers.is_empty() {
            warn!(device = device_name, "no built-in drivers in this build");
            return Err(Error::NoBuiltinDrivers);
        }
        self.open_with_drivers(device_name, &drivers)
    }

    /// Probe an explicit, caller-ordered driver list for `device_name`.
    ///
    /// A full registry aborts the probe immediately; trying further
    /// drivers cannot free a slot.
    pub fn open_with_drivers(
        &mut self,
        device_name: &str,
        drivers: &[&dyn BusDriver],
    ) -> Result<BusHandle> {
        for driver in drivers {
            match self.open_with_driver(device_name, *driver) {
                Ok(handle) => return Ok(handle),
                Err(e @ Error::NoFreeHandle { .. }) => return Err(e),
                Err(e) => {
                    debug!(device = device_name, driver = driver.name(), error = %e,
                        "driver did not open device");
                }
            }
        }
        Err(Error::NoDriverMatched {
            device: device_name.to_string(),
        })
    }

    /// Open `device_name` with one specific driver.
    ///
    /// Allocates the lowest free slot, opens the port at the registry's
    /// current baud rate, and issues the mandatory receive purge. A failed
    /// purge rolls the slot back to closed before the handle ever reaches
    /// the caller, so a handle returned from here is always usable.
    pub fn open_with_driver(
        &mut self,
        device_name: &str,
        driver: &dyn BusDriver,
    ) -> Result<BusHandle> {
        let handle = self.allocate()?;
        let baud_rate = self.baud_rate();

        let port = match driver.open(device_name, baud_rate) {
            Ok(port) => port,
            Err(e) => {
                debug!(device = device_name, driver = driver.name(), error = %e,
                    "open failed");
                return Err(Error::OpenFailed {
                    device: device_name.to_string(),
                    driver: driver.name(),
                });
            }
        };

        self.install(handle, port);

        // Stale input from before our open must not be mistaken for a
        // reply to the first command.
        if let Err(e) = self.misc_operation(handle, MiscOperation::PurgeRx) {
            warn!(device = device_name, driver = driver.name(), error = %e,
                "post-open purge failed, closing");
            let _ = self.close(handle);
            return Err(Error::OpenFailed {
                device: device_name.to_string(),
                driver: driver.name(),
            });
        }

        debug!(
            device = device_name,
            driver = driver.name(),
            handle = %handle,
            baud = baud_rate,
            "bus device opened"
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockDriver;

    #[test]
    fn probe_takes_first_matching_driver() {
        let serial_like = MockDriver::new().with_prefix("/dev/");
        let net_like = MockDriver::new().with_prefix("net:");
        let mut registry = BusRegistry::new();

        let drivers: Vec<&dyn BusDriver> = vec![&serial_like, &net_like];
        let handle = registry
            .open_with_drivers("net:drive1", &drivers)
            .unwrap();

        assert!(registry.is_open(handle));
        assert_eq!(serial_like.open_count(), 0);
        assert_eq!(net_like.open_count(), 1);
    }

    #[test]
    fn probe_exhaustion_reports_no_driver_matched() {
        let serial_like = MockDriver::new().with_prefix("/dev/");
        let mut registry = BusRegistry::new();

        let drivers: Vec<&dyn BusDriver> = vec![&serial_like];
        let err = registry
            .open_with_drivers("unmatched-name", &drivers)
            .unwrap_err();
        assert!(matches!(err, Error::NoDriverMatched { .. }));
        assert_eq!(registry.open_count(), 0);
    }

    #[test]
    fn probe_aborts_when_registry_is_full() {
        let driver = MockDriver::new();
        let mut registry = BusRegistry::with_capacity(1);
        registry.open_with_driver("mock0", &driver).unwrap();

        let drivers: Vec<&dyn BusDriver> = vec![&driver];
        let err = registry.open_with_drivers("mock1", &drivers).unwrap_err();
        assert!(matches!(err, Error::NoFreeHandle { capacity: 1 }));
    }

    #[test]
    fn failed_open_leaves_slot_free() {
        let broken = MockDriver::new().failing_open();
        let good = MockDriver::new();
        let mut registry = BusRegistry::with_capacity(1);

        let err = registry.open_with_driver("mock0", &broken).unwrap_err();
        assert!(matches!(err, Error::OpenFailed { .. }));

        let handle = registry.open_with_driver("mock0", &good).unwrap();
        assert_eq!(handle.index(), 0);
    }

    #[test]
    fn failed_purge_rolls_the_slot_back() {
        let driver = MockDriver::new().failing_purge();
        let mut registry = BusRegistry::new();

        let err = registry.open_with_driver("mock0", &driver).unwrap_err();
        assert!(matches!(err, Error::OpenFailed { .. }));
        assert_eq!(registry.open_count(), 0);

        // the port was opened, purged, then closed again
        assert_eq!(driver.open_count(), 1);
        assert_eq!(driver.close_count(), 1);

        // the slot is immediately reusable
        let good = MockDriver::new();
        let handle = registry.open_with_driver("mock0", &good).unwrap();
        assert_eq!(handle.index(), 0);
    }

    #[test]
    fn open_issues_purge_before_returning() {
        let driver = MockDriver::new();
        let mut registry = BusRegistry::new();
        registry.open_with_driver("mock0", &driver).unwrap();
        assert_eq!(driver.misc_ops(), vec![MiscOperation::PurgeRx]);
    }

    #[cfg(feature = "built-in-drivers")]
    #[test]
    fn builtin_driver_order_is_serial_first() {
        let drivers = builtin_drivers();
        assert!(drivers.len() >= 2);
        assert_eq!(drivers[0].name(), "serial");
        assert_eq!(drivers[1].name(), "tcp");
    }
}
