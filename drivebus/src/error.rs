//! Common error types for drivebus.
//!
//! This module provides a centralized Error enum using thiserror. Every
//! failure in the bus layer is reported synchronously as a value; nothing
//! in the public API panics or unwinds.

use thiserror::Error;

use crate::driver::IoDirection;
use crate::registry::BusHandle;

/// Main error type for bus device operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Handle out of range, or its slot is not open
    #[error("invalid bus handle {0}")]
    InvalidHandle(BusHandle),

    /// Every registry slot is already open
    #[error("all {capacity} bus slots are in use")]
    NoFreeHandle { capacity: usize },

    /// Driver probing exhausted without a successful open
    #[error("no driver matched device name {device:?}")]
    NoDriverMatched { device: String },

    /// Built-in drivers were excluded from this build
    #[error("no built-in drivers compiled in; enable the built-in-drivers feature or use open_with_driver")]
    NoBuiltinDrivers,

    /// Driver open failed, or the mandatory post-open purge failed
    #[error("driver {driver} failed to open {device:?}")]
    OpenFailed {
        device: String,
        driver: &'static str,
    },

    /// Transmit buffer is at capacity; the byte was not queued
    #[error("transmit buffer full ({capacity} bytes)")]
    BufferFull { capacity: usize },

    /// Transferred byte count differs from the requested count
    #[error("short {direction}: {transferred} of {requested} bytes")]
    ShortIo {
        direction: IoDirection,
        requested: usize,
        transferred: usize,
    },

    /// Transport-level I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// No device discovery backend in this build
    #[error("bus enumeration requires the d2xx feature")]
    EnumerationUnavailable,
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
