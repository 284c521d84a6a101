//! Bus device registry: slot table, handle allocation and lifecycle.
//!
//! The registry is a fixed-capacity table of device slots addressed by
//! small integer handles. It is an explicit object owned by the caller;
//! every mutating operation takes `&mut self`, so one registry has exactly
//! one logical owner and the open/close transitions need no internal
//! locking. A handle is valid iff its index is in range and the slot is
//! open.
//!
//! A slot becomes open only through a successful driver open followed by a
//! successful receive purge (see [`crate::probe`]); any close, regardless
//! of the port's own close result, forces it back to closed. Slots are
//! never destroyed independently of the registry.

use std::fmt;

use crate::config::BusConfig;
use crate::driver::{BusPort, DEFAULT_BAUD_RATE};
use crate::error::{Error, Result};
use crate::session::TxBuffer;
use crate::status::StatusFlags;
use crate::tracing::prelude::*;

/// Number of slots in a registry built with [`BusRegistry::new`].
pub const DEFAULT_MAX_BUSES: usize = 8;

/// Index of one registry slot.
///
/// Handles are plain 0-based indexes; the lowest free index is always
/// allocated first, and a closed slot's index is reused by the next open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusHandle(pub(crate) usize);

impl BusHandle {
    /// The slot index behind this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One device slot. `port` is `Some` exactly while the slot is open.
pub(crate) struct BusSlot {
    pub(crate) port: Option<Box<dyn BusPort>>,
    pub(crate) tx: TxBuffer,
    pub(crate) status: StatusFlags,
}

impl BusSlot {
    fn closed() -> Self {
        Self {
            port: None,
            tx: TxBuffer::new(),
            status: StatusFlags::empty(),
        }
    }
}

/// Fixed-capacity table of bus device slots.
pub struct BusRegistry {
    slots: Vec<BusSlot>,
    baud_rate: u32,
}

impl BusRegistry {
    /// Create a registry with [`DEFAULT_MAX_BUSES`] slots, all closed.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_BUSES)
    }

    /// Create a registry with `max_buses` slots, all closed.
    pub fn with_capacity(max_buses: usize) -> Self {
        Self {
            slots: (0..max_buses).map(|_| BusSlot::closed()).collect(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    /// Create a registry sized and tuned from a [`BusConfig`].
    pub fn from_config(config: &BusConfig) -> Self {
        let mut registry = Self::with_capacity(config.max_buses);
        registry.set_baud_rate(config.baud_rate);
        registry
    }

    /// Number of slots in the table.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently open.
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.port.is_some()).count()
    }

    /// Baud rate applied to subsequent opens.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Set the baud rate for subsequent opens.
    ///
    /// Handles already open keep the rate they were opened with.
    pub fn set_baud_rate(&mut self, baud_rate: u32) {
        self.baud_rate = baud_rate;
    }

    /// Whether `handle` is in range and its slot is open.
    pub fn is_open(&self, handle: BusHandle) -> bool {
        self.slots
            .get(handle.0)
            .is_some_and(|slot| slot.port.is_some())
    }

    /// First-fit scan for a closed slot, lowest index wins.
    pub(crate) fn allocate(&self) -> Result<BusHandle> {
        match self.slots.iter().position(|slot| slot.port.is_none()) {
            Some(index) => Ok(BusHandle(index)),
            None => Err(Error::NoFreeHandle {
                capacity: self.slots.len(),
            }),
        }
    }

    /// Validated mutable access to an open slot.
    pub(crate) fn slot_mut(&mut self, handle: BusHandle) -> Result<&mut BusSlot> {
        match self.slots.get_mut(handle.0) {
            Some(slot) if slot.port.is_some() => Ok(slot),
            _ => Err(Error::InvalidHandle(handle)),
        }
    }

    /// Install `port` into a closed slot, making the handle addressable.
    ///
    /// The transmit buffer and cumulative status are reset so nothing
    /// leaks across open lifetimes of the same slot index.
    pub(crate) fn install(&mut self, handle: BusHandle, port: Box<dyn BusPort>) {
        let slot = &mut self.slots[handle.0];
        debug_assert!(slot.port.is_none(), "install into open slot");
        slot.port = Some(port);
        slot.tx.clear();
        slot.status = StatusFlags::empty();
    }

    /// Close `handle` and release its port.
    ///
    /// The port's own close result is logged but never surfaced; the slot
    /// ends up closed no matter what the transport reports. Fails only
    /// when the handle was not valid and open at entry.
    pub fn close(&mut self, handle: BusHandle) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        if let Some(mut port) = slot.port.take() {
            if let Err(e) = port.close() {
                warn!(handle = %handle, error = %e, "port close reported an error");
            }
        }
        slot.tx.clear();
        debug!(handle = %handle, "bus device closed");
        Ok(())
    }

    /// Cumulative status flags recorded for `handle` since it was opened.
    pub fn cumulative_status(&self, handle: BusHandle) -> Result<StatusFlags> {
        match self.slots.get(handle.0) {
            Some(slot) if slot.port.is_some() => Ok(slot.status),
            _ => Err(Error::InvalidHandle(handle)),
        }
    }

    /// Merge `flags` into the handle's cumulative status.
    ///
    /// Protocol layers above the byte transport use this to stack their
    /// own fault flags onto the handle.
    pub fn accumulate_status(&mut self, handle: BusHandle, flags: StatusFlags) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        slot.status |= flags;
        Ok(())
    }
}

impl Default for BusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusFlags;
    use crate::transport::mock::MockDriver;

    #[test]
    fn fresh_registry_is_all_closed() {
        let registry = BusRegistry::with_capacity(3);
        assert_eq!(registry.capacity(), 3);
        assert_eq!(registry.open_count(), 0);
        for index in 0..3 {
            assert!(!registry.is_open(BusHandle(index)));
        }
    }

    #[test]
    fn out_of_range_handle_is_invalid() {
        let registry = BusRegistry::with_capacity(2);
        assert!(!registry.is_open(BusHandle(2)));
        assert!(!registry.is_open(BusHandle(usize::MAX)));
    }

    #[test]
    fn baud_rate_defaults_and_updates() {
        let mut registry = BusRegistry::new();
        assert_eq!(registry.baud_rate(), DEFAULT_BAUD_RATE);
        registry.set_baud_rate(115_200);
        assert_eq!(registry.baud_rate(), 115_200);
    }

    #[test]
    fn open_uses_current_baud_rate() {
        let driver = MockDriver::new();
        let mut registry = BusRegistry::new();
        registry.set_baud_rate(9_600);
        registry.open_with_driver("mock0", &driver).unwrap();
        assert_eq!(driver.baud_rates(), vec![9_600]);
    }

    #[test]
    fn close_on_closed_slot_fails_without_side_effects() {
        let driver = MockDriver::new();
        let mut registry = BusRegistry::with_capacity(2);
        let handle = registry.open_with_driver("mock0", &driver).unwrap();

        assert!(matches!(
            registry.close(BusHandle(1)),
            Err(Error::InvalidHandle(_))
        ));
        assert!(registry.is_open(handle));
        assert_eq!(registry.open_count(), 1);
    }

    #[test]
    fn close_is_terminal_even_when_port_close_fails() {
        let driver = MockDriver::new().failing_close();
        let mut registry = BusRegistry::new();
        let handle = registry.open_with_driver("mock0", &driver).unwrap();

        registry.close(handle).unwrap();
        assert!(!registry.is_open(handle));

        // a second close sees an already-closed slot
        assert!(matches!(
            registry.close(handle),
            Err(Error::InvalidHandle(_))
        ));
    }

    #[test]
    fn allocation_is_first_fit_lowest_index() {
        let driver = MockDriver::new();
        let mut registry = BusRegistry::with_capacity(4);

        let handles: Vec<_> = (0..4)
            .map(|_| registry.open_with_driver("mock0", &driver).unwrap())
            .collect();
        assert_eq!(
            handles.iter().map(|h| h.index()).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );

        registry.close(handles[1]).unwrap();
        let reused = registry.open_with_driver("mock0", &driver).unwrap();
        assert_eq!(reused.index(), 1);
    }

    #[test]
    fn status_resets_on_reopen() {
        let driver = MockDriver::new();
        let mut registry = BusRegistry::new();
        let handle = registry.open_with_driver("mock0", &driver).unwrap();

        registry
            .accumulate_status(handle, StatusFlags::PARAMETER)
            .unwrap();
        assert_eq!(
            registry.cumulative_status(handle).unwrap(),
            StatusFlags::PARAMETER
        );

        registry.close(handle).unwrap();
        let handle = registry.open_with_driver("mock0", &driver).unwrap();
        assert_eq!(
            registry.cumulative_status(handle).unwrap(),
            StatusFlags::empty()
        );
    }

    #[test]
    fn status_of_closed_handle_is_invalid() {
        let registry = BusRegistry::new();
        assert!(matches!(
            registry.cumulative_status(BusHandle(0)),
            Err(Error::InvalidHandle(_))
        ));
    }
}
