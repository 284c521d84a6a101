//! Per-handle device operations: buffered writes, transmit, reads and
//! control operations.
//!
//! Outgoing bytes are staged one at a time in a fixed transmit buffer and
//! pushed to the transport in a single write by [`BusRegistry::transmit`].
//! The buffer is always emptied by a transmit, successful or not; there is
//! no redelivery of unsent bytes. Callers that care about short writes
//! check the result and rebuild the frame themselves.

use crate::driver::{IoDirection, MiscOperation};
use crate::error::{Error, Result};
use crate::registry::{BusHandle, BusRegistry, BusSlot};
use crate::status::StatusFlags;
use crate::tracing::prelude::*;

/// Capacity of the per-handle transmit buffer.
pub const TX_BUFFER_CAPACITY: usize = 128;

/// Fixed-capacity FIFO staging buffer for outgoing bytes.
pub(crate) struct TxBuffer {
    buf: [u8; TX_BUFFER_CAPACITY],
    used: usize,
}

impl TxBuffer {
    pub(crate) fn new() -> Self {
        Self {
            buf: [0; TX_BUFFER_CAPACITY],
            used: 0,
        }
    }

    /// Append one byte, failing without side effects when full.
    pub(crate) fn push(&mut self, byte: u8) -> Result<()> {
        if self.used == self.buf.len() {
            return Err(Error::BufferFull {
                capacity: self.buf.len(),
            });
        }
        self.buf[self.used] = byte;
        self.used += 1;
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.used
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.used]
    }

    pub(crate) fn clear(&mut self) {
        self.used = 0;
    }
}

impl BusRegistry {
    /// Queue one byte for a later [`transmit`].
    ///
    /// Fails with [`Error::BufferFull`] when the buffer is at capacity; the
    /// buffer is left unchanged and nothing is flushed implicitly.
    ///
    /// [`transmit`]: BusRegistry::transmit
    pub fn write_byte(&mut self, handle: BusHandle, byte: u8) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        match slot.tx.push(byte) {
            Ok(()) => {
                trace!(handle = %handle, byte = %format!("{byte:02x}"), "queued byte");
                Ok(())
            }
            Err(e) => {
                debug!(handle = %handle, byte = %format!("{byte:02x}"), "tx buffer overflow");
                Err(e)
            }
        }
    }

    /// Push the staged bytes to the transport in one write.
    ///
    /// Succeeds only when the driver reports a transferred count equal to
    /// the staged length. The buffer is emptied either way.
    pub fn transmit(&mut self, handle: BusHandle) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        let BusSlot { port, tx, status } = slot;
        let Some(port) = port.as_mut() else {
            return Err(Error::InvalidHandle(handle));
        };

        let requested = tx.len();
        trace!(
            handle = %handle,
            len = requested,
            data = %hex::encode(tx.as_bytes()),
            "transmitting"
        );
        let outcome = port.write(tx.as_bytes());
        tx.clear();

        match outcome {
            Ok(n) if n == requested => Ok(()),
            Ok(n) => {
                *status |= StatusFlags::COMMUNICATION;
                warn!(handle = %handle, requested, transferred = n, "short transmit, bytes dropped");
                Err(Error::ShortIo {
                    direction: IoDirection::Write,
                    requested,
                    transferred: n,
                })
            }
            Err(e) => {
                *status |= StatusFlags::COMMUNICATION;
                warn!(handle = %handle, error = %e, "transmit failed, bytes dropped");
                Err(Error::ShortIo {
                    direction: IoDirection::Write,
                    requested,
                    transferred: 0,
                })
            }
        }
    }

    /// Read exactly one byte from the bus.
    ///
    /// The port blocks for at most its own bounded interval; anything other
    /// than exactly one byte back is a [`Error::ShortIo`].
    pub fn read_byte(&mut self, handle: BusHandle) -> Result<u8> {
        let slot = self.slot_mut(handle)?;
        let BusSlot { port, status, .. } = slot;
        let Some(port) = port.as_mut() else {
            return Err(Error::InvalidHandle(handle));
        };

        let mut byte = [0u8; 1];
        match port.read(&mut byte) {
            Ok(1) => {
                trace!(handle = %handle, byte = %format!("{:02x}", byte[0]), "got byte");
                Ok(byte[0])
            }
            Ok(n) => {
                *status |= StatusFlags::COMMUNICATION;
                debug!(handle = %handle, transferred = n, "reading a byte from bus failed");
                Err(Error::ShortIo {
                    direction: IoDirection::Read,
                    requested: 1,
                    transferred: n,
                })
            }
            Err(e) => {
                *status |= StatusFlags::COMMUNICATION;
                debug!(handle = %handle, error = %e, "reading a byte from bus failed");
                Err(Error::ShortIo {
                    direction: IoDirection::Read,
                    requested: 1,
                    transferred: 0,
                })
            }
        }
    }

    /// Run a transport control operation on the handle.
    ///
    /// Any staged unsent bytes are discarded first, then the operation is
    /// delegated to the port and its result returned.
    pub fn misc_operation(&mut self, handle: BusHandle, op: MiscOperation) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        let BusSlot { port, tx, .. } = slot;
        let Some(port) = port.as_mut() else {
            return Err(Error::InvalidHandle(handle));
        };

        tx.clear();
        port.misc_operation(op).map_err(|e| {
            debug!(handle = %handle, op = %op, error = %e, "misc operation failed");
            Error::Io(e)
        })
    }
}
