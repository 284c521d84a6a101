//! Transport-agnostic bus device layer for motor drive communication.
//!
//! Drives hang off serial lines, TCP bridges and vendor USB adapters, but
//! callers should not care which: this crate presents a small integer
//! handle and a handful of uniform operations over whatever transport a
//! device name resolves to.
//!
//! The pieces:
//!
//! - [`BusRegistry`] owns a fixed table of device slots and the handle
//!   lifecycle. It is an ordinary object: construct one, keep it, pass it
//!   `&mut` to every call. Mutating operations on one registry must come
//!   from one logical owner; operations on distinct handles are otherwise
//!   independent.
//! - [`BusRegistry::open`] probes the built-in drivers (serial, TCP,
//!   optional FTDI D2XX) in priority order; [`BusDriver`]/[`BusPort`] let
//!   applications plug in their own transport instead.
//! - Outgoing bytes are staged per handle with [`BusRegistry::write_byte`]
//!   and pushed in one piece by [`BusRegistry::transmit`]. Short writes
//!   drop the unsent tail by contract; nothing is retried.
//! - [`enumerate`] passes through vendor adapter discovery when the
//!   backend is compiled in.
//!
//! ```no_run
//! use drivebus::{BusRegistry, Result};
//!
//! fn ping(registry: &mut BusRegistry) -> Result<u8> {
//!     let bus = registry.open("/dev/ttyUSB0")?;
//!     for byte in [0x55, 0xaa] {
//!         registry.write_byte(bus, byte)?;
//!     }
//!     registry.transmit(bus)?;
//!     let reply = registry.read_byte(bus)?;
//!     registry.close(bus)?;
//!     Ok(reply)
//! }
//! ```

pub mod config;
pub mod driver;
pub mod enumerate;
pub mod error;
pub mod probe;
pub mod registry;
pub mod session;
pub mod status;
pub mod tracing;
pub mod transport;

pub use config::BusConfig;
pub use driver::{BusDriver, BusPort, IoDirection, MiscOperation, DEFAULT_BAUD_RATE};
pub use enumerate::{bus_device_details, detected_bus_count, BusDeviceInfo};
pub use error::{Error, Result};
pub use probe::builtin_drivers;
pub use registry::{BusHandle, BusRegistry, DEFAULT_MAX_BUSES};
pub use session::TX_BUFFER_CAPACITY;
pub use status::StatusFlags;
