//! Capability contract implemented by each transport.
//!
//! A transport plugs into the bus layer as a pair of traits: [`BusDriver`]
//! is the factory that knows how to claim a device name and open it, and
//! [`BusPort`] is the opened connection the registry drives afterwards.
//! The registry never learns what is behind a port; serial lines, TCP
//! sockets and vendor USB adapters all look the same from above.

use std::io;

/// Baud rate used when the caller has not set one on the registry.
pub const DEFAULT_BAUD_RATE: u32 = 460_800;

/// Bounded interval a port read may block before returning a short count.
pub const READ_TIMEOUT_MS: u64 = 500;

/// Transport-defined control operations.
///
/// `PurgeRx` is the one operation the core itself depends on: it is issued
/// once on every open, before the handle is handed to the caller. The rest
/// are available to callers for transport-specific housekeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MiscOperation {
    /// Discard unread input buffered by the transport
    PurgeRx,
    /// Drain output queued inside the transport
    FlushTx,
}

/// Transfer direction, for short I/O reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum IoDirection {
    Read,
    Write,
}

/// An open connection to one bus device.
///
/// Implementations own whatever state the transport needs (file
/// descriptor, socket, vendor handle) and release it on [`close`] or drop.
/// Reads block for at most a bounded, implementation-defined interval and
/// then return a short count, possibly zero; they never block forever.
/// Ports must be `Send` so a registry can move between threads, but a
/// single port is only ever driven by one caller at a time.
///
/// [`close`]: BusPort::close
pub trait BusPort: Send {
    /// Read up to `buf.len()` bytes, returning the count actually read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `buf`, returning the count actually written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Perform a transport-defined control operation.
    fn misc_operation(&mut self, op: MiscOperation) -> io::Result<()>;

    /// Release the underlying device.
    ///
    /// The registry logs a failure here but never surfaces it; the slot is
    /// closed regardless.
    fn close(&mut self) -> io::Result<()>;
}

/// Factory for one transport's ports.
///
/// Each driver matches device names by its own convention (path prefix,
/// `host:port` shape, adapter serial number) and rejects names that are
/// not its own, so the probe can walk a driver list until one claims the
/// name.
pub trait BusDriver: Send + Sync {
    /// Short tag used in diagnostics.
    fn name(&self) -> &'static str;

    /// Try to open `device_name` at `baud_rate`.
    fn open(&self, device_name: &str, baud_rate: u32) -> io::Result<Box<dyn BusPort>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misc_operation_display() {
        assert_eq!(MiscOperation::PurgeRx.to_string(), "PurgeRx");
        assert_eq!(MiscOperation::FlushTx.to_string(), "FlushTx");
    }

    #[test]
    fn io_direction_display_is_lowercase() {
        assert_eq!(IoDirection::Read.to_string(), "read");
        assert_eq!(IoDirection::Write.to_string(), "write");
    }
}
