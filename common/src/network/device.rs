use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use pnet::util::MacAddr;

/// Host name reported when reverse resolution fails.
pub const UNKNOWN_HOSTNAME: &str = "Unknown";

/// Hardware address of a discovered device.
///
/// ARP resolution is not performed, so sweeps always produce [`MacAddress::Unknown`].
/// It renders as `N/A` but can never be mistaken for a real address.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacAddress {
    #[default]
    Unknown,
    Known(MacAddr),
}

impl MacAddress {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("N/A"),
            Self::Known(mac) => write!(f, "{mac}"),
        }
    }
}

/// A host that answered its echo request.
///
/// Only the prober creates these, and nothing mutates them afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    ip: Ipv4Addr,
    mac: MacAddress,
    hostname: Option<String>,
    response_time: Duration,
}

impl DeviceInfo {
    pub fn new(ip: Ipv4Addr, hostname: Option<String>, response_time: Duration) -> Self {
        Self {
            ip,
            mac: MacAddress::Unknown,
            hostname,
            response_time,
        }
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// The resolved name, or `"Unknown"` when the reverse lookup failed.
    pub fn hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or(UNKNOWN_HOSTNAME)
    }

    pub fn is_hostname_resolved(&self) -> bool {
        self.hostname.is_some()
    }

    /// Round-trip time of the echo, truncated to whole milliseconds.
    pub fn response_time_ms(&self) -> u64 {
        u64::try_from(self.response_time.as_millis()).unwrap_or(u64::MAX)
    }
}
