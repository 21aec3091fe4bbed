//! Boundaries between the discovery engine and the outside world.
//!
//! The engine only talks to the OS and to its consumer through these traits.
//! Concrete implementations live in [`crate::network`]; the presentation layer
//! implements [`ScanObserver`].

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use netsweep_common::network::device::DeviceInfo;
use netsweep_common::network::interface::LocalAddress;

/// Reads the host's interface table.
pub trait LocalAddressSource: Send + Sync {
    /// The first active, non-loopback IPv4 address, optionally restricted to one interface.
    fn local_address(&self, only: Option<&str>) -> Option<LocalAddress>;
}

/// Sends a single echo request and waits for its reply.
///
/// Implementations do not need to enforce the probe timeout: the prober drops
/// the future once it expires.
#[async_trait]
pub trait Pinger: Send + Sync {
    /// Returns the measured round-trip time.
    async fn echo(&self, addr: Ipv4Addr) -> anyhow::Result<Duration>;
}

/// Reverse (PTR) name resolution.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn reverse_lookup(&self, addr: Ipv4Addr) -> anyhow::Result<String>;
}

/// Receives scan lifecycle notifications, typically to drive a user interface.
pub trait ScanObserver: Send + Sync {
    /// The registry was cleared and probing is about to begin.
    fn on_scan_started(&self);

    /// A host answered. Emitted as soon as it is appended to the registry.
    fn on_device_found(&self, device: &DeviceInfo);

    /// Every candidate was probed, or the scan was stopped.
    fn on_scan_finished(&self);

    /// The scan could not start. The observer is responsible for resetting
    /// whatever it showed in [`ScanObserver::on_scan_started`].
    fn on_fatal_error(&self, message: &str);

    fn on_probe_complete(&self, _done: usize, _total: usize) {}
}
