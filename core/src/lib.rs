//! # netsweep core
//!
//! The discovery engine: resolves the local address, sweeps the surrounding
//! /24 with ICMP echo requests and collects every host that answered.
//!
//! * [`discovery`]: the coordinator that owns the scan lifecycle and the registry.
//! * [`prober`]: probes a single address and builds its [`DeviceInfo`].
//! * [`ports`]: traits the engine depends on, implemented in [`network`]
//!   against the real OS and replaced by fakes in tests.
//!
//! [`DeviceInfo`]: netsweep_common::network::device::DeviceInfo

pub mod discovery;
pub mod network;
pub mod ports;
pub mod prober;
pub mod registry;

pub use discovery::{DiscoveryCoordinator, ScanReport};
pub use prober::{EchoOutcome, HostProber, ProbeOutcome};
