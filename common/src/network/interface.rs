//! Selection of the address a sweep is anchored on.
//!
//! The OS interface table is read elsewhere; this module only decides which
//! interface/address pair qualifies, so it can be tested with fabricated
//! [`NetworkInterface`] values.

use std::fmt;
use std::net::Ipv4Addr;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;
use tracing::trace;

/// An IPv4 address bound to the first active interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAddress {
    pub interface: String,
    pub addr: Ipv4Addr,
    /// Prefix length actually configured on the interface. Informational only.
    pub prefix: u8,
}

impl fmt::Display for LocalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.addr, self.interface)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SkipReason {
    /// The interface is operationally down.
    IsDown,
    IsLoopback,
    /// A specific interface was requested and this is not it.
    NotRequested,
    /// Up, but no non-loopback IPv4 address is bound.
    NoIpv4,
}

/// Walks `interfaces` in enumeration order and returns the first IPv4 address
/// of the first interface that is up and not a loopback.
///
/// When `only` names an interface, every other interface is skipped.
pub fn select_local_address<'a, I>(interfaces: I, only: Option<&str>) -> Option<LocalAddress>
where
    I: IntoIterator<Item = &'a NetworkInterface>,
{
    interfaces.into_iter().find_map(|interface| {
        match first_ipv4(interface, only) {
            Ok(net) => Some(LocalAddress {
                interface: interface.name.clone(),
                addr: net.0,
                prefix: net.1,
            }),
            Err(reason) => {
                trace!(interface = %interface.name, ?reason, "skipping interface");
                None
            }
        }
    })
}

fn first_ipv4(
    interface: &NetworkInterface,
    only: Option<&str>,
) -> Result<(Ipv4Addr, u8), SkipReason> {
    if only.is_some_and(|name| name != interface.name) {
        return Err(SkipReason::NotRequested);
    }
    if !interface.is_up() {
        return Err(SkipReason::IsDown);
    }
    if interface.is_loopback() {
        return Err(SkipReason::IsLoopback);
    }
    interface
        .ips
        .iter()
        .find_map(|net| match net {
            IpNetwork::V4(v4) if !v4.ip().is_loopback() => Some((v4.ip(), v4.prefix())),
            _ => None,
        })
        .ok_or(SkipReason::NoIpv4)
}
