//! Network domain models.
//!
//! * [`device::DeviceInfo`]: one responsive host found by a sweep.
//! * [`range::SubnetRange`]: the 254 candidates derived from the local address.
//! * [`interface::LocalAddress`]: the address a sweep is anchored on.

pub mod device;
pub mod interface;
pub mod range;
