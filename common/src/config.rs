use std::net::IpAddr;
use std::time::Duration;

use crate::error::ScanError;

/// Per-probe echo timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
/// Reverse lookup timeout.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_millis(1_000);
/// Number of probes allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    /// How long a single echo request may wait for its reply.
    pub probe_timeout: Duration,

    /// Width of the probe worker pool. `1` probes strictly in enumeration order.
    pub concurrency: usize,

    /// Disables reverse lookups. Every host is reported as "Unknown".
    pub no_dns: bool,

    /// Nameserver for reverse lookups. Falls back to `/etc/resolv.conf`.
    pub dns_server: Option<IpAddr>,

    pub dns_timeout: Duration,

    /// Restricts local address resolution to a single interface.
    pub interface: Option<String>,

    /// Output verbosity of the terminal front end (0 = full, 2 = silent).
    pub quiet: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            no_dns: false,
            dns_server: None,
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            interface: None,
            quiet: 0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.concurrency == 0 {
            return Err(ScanError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.probe_timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        if !self.no_dns && self.dns_timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "dns timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
