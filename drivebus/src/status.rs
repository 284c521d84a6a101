//! Cumulative per-handle status flags.
//!
//! Each open slot carries a bitmask that accumulates fault flags over the
//! handle's open lifetime. The bus layer itself records communication
//! faults (short reads and writes); protocol layers above stack their own
//! flags on top through [`BusRegistry::accumulate_status`]. The mask is
//! cleared on every successful open.
//!
//! [`BusRegistry::accumulate_status`]: crate::registry::BusRegistry::accumulate_status

use bitflags::bitflags;

bitflags! {
    /// Fault flags accumulated per handle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u32 {
        /// Device did not respond
        const NO_DEVICE = 1 << 0;
        /// Bus-level fault reported by the transport
        const BUS_ERROR = 1 << 1;
        /// Short read or write on the wire
        const COMMUNICATION = 1 << 2;
        /// Device rejected a parameter
        const PARAMETER = 1 << 3;
        /// Payload length mismatch
        const LENGTH = 1 << 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accumulate() {
        let mut status = StatusFlags::empty();
        status |= StatusFlags::COMMUNICATION;
        status |= StatusFlags::LENGTH;
        assert!(status.contains(StatusFlags::COMMUNICATION));
        assert!(status.contains(StatusFlags::LENGTH));
        assert!(!status.contains(StatusFlags::NO_DEVICE));
    }
}
