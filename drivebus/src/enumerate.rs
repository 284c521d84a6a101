//! Bus adapter enumeration.
//!
//! A thin pass-through to the vendor discovery backend. Builds without the
//! `d2xx` feature see zero adapters and a deterministic failure from
//! [`bus_device_details`], independent of the index asked for; serial and
//! TCP devices are addressed by name and are never enumerated.

use serde::Serialize;

use crate::error::Result;
#[cfg(not(feature = "d2xx"))]
use crate::error::Error;

/// Descriptor for one detected bus adapter.
#[derive(Debug, Clone, Serialize)]
pub struct BusDeviceInfo {
    /// Name accepted by [`BusRegistry::open`](crate::BusRegistry::open)
    pub device_name: String,
    /// Human-readable adapter description
    pub description: String,
    pub serial_number: String,
    /// Whether some process already holds the adapter open
    pub in_use: bool,
}

/// Number of bus adapters detected by the discovery backend.
#[cfg(feature = "d2xx")]
pub fn detected_bus_count() -> usize {
    crate::transport::d2xx::detected_bus_count()
}

/// Number of bus adapters detected by the discovery backend.
#[cfg(not(feature = "d2xx"))]
pub fn detected_bus_count() -> usize {
    0
}

/// Descriptor of the detected adapter at `index`.
#[cfg(feature = "d2xx")]
pub fn bus_device_details(index: usize) -> Result<BusDeviceInfo> {
    crate::transport::d2xx::bus_device_details(index)
}

/// Descriptor of the detected adapter at `index`.
#[cfg(not(feature = "d2xx"))]
pub fn bus_device_details(_index: usize) -> Result<BusDeviceInfo> {
    Err(Error::EnumerationUnavailable)
}
