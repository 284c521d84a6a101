//! Built-in transports.
//!
//! Each submodule implements the capability contract from
//! [`crate::driver`] for one physical transport. The probe in
//! [`crate::probe`] walks them in priority order; nothing above this
//! module knows which transport ended up behind a handle.

#[cfg(feature = "d2xx")]
pub mod d2xx;
pub mod mock;
#[cfg(feature = "built-in-drivers")]
pub mod serial;
#[cfg(feature = "built-in-drivers")]
pub mod tcp;
