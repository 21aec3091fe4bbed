//! Probing of a single candidate address.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use netsweep_common::config::Config;
use netsweep_common::network::device::DeviceInfo;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::ports::{NameResolver, Pinger};

/// Result of the echo step alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoOutcome {
    Reached { rtt: Duration },
    Unreachable,
}

/// Result of probing one address.
///
/// `Unreachable` is the expected outcome for most of a sweep, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found(DeviceInfo),
    Unreachable,
}

#[cfg(test)]
impl ProbeOutcome {
    fn device(&self) -> Option<&DeviceInfo> {
        match self {
            Self::Found(device) => Some(device),
            Self::Unreachable => None,
        }
    }
}

/// Sends one echo request per address and, on a reply, one reverse lookup.
///
/// No retries: a lost reply excludes the address from the current scan.
pub struct HostProber {
    pinger: Arc<dyn Pinger>,
    resolver: Option<Arc<dyn NameResolver>>,
    probe_timeout: Duration,
    dns_timeout: Duration,
}

impl HostProber {
    /// `resolver` is ignored when the configuration disables DNS.
    pub fn new(
        pinger: Arc<dyn Pinger>,
        resolver: Option<Arc<dyn NameResolver>>,
        cfg: &Config,
    ) -> Self {
        Self {
            pinger,
            resolver: resolver.filter(|_| !cfg.no_dns),
            probe_timeout: cfg.probe_timeout,
            dns_timeout: cfg.dns_timeout,
        }
    }

    pub async fn probe(&self, addr: Ipv4Addr) -> ProbeOutcome {
        let rtt = match self.echo(addr).await {
            EchoOutcome::Reached { rtt } => rtt,
            EchoOutcome::Unreachable => return ProbeOutcome::Unreachable,
        };

        let hostname: Option<String> = self.resolve(addr).await;
        let device = DeviceInfo::new(addr, hostname, rtt);
        debug!(
            ip = %addr,
            rtt_ms = device.response_time_ms(),
            hostname = device.hostname(),
            "host is up"
        );
        ProbeOutcome::Found(device)
    }

    pub async fn echo(&self, addr: Ipv4Addr) -> EchoOutcome {
        match timeout(self.probe_timeout, self.pinger.echo(addr)).await {
            Ok(Ok(rtt)) => EchoOutcome::Reached { rtt },
            Ok(Err(e)) => {
                trace!(ip = %addr, error = %e, "echo failed");
                EchoOutcome::Unreachable
            }
            Err(_) => {
                trace!(ip = %addr, "echo timed out");
                EchoOutcome::Unreachable
            }
        }
    }

    async fn resolve(&self, addr: Ipv4Addr) -> Option<String> {
        let resolver = self.resolver.as_ref()?;
        match timeout(self.dns_timeout, resolver.reverse_lookup(addr)).await {
            Ok(Ok(hostname)) => Some(hostname),
            Ok(Err(e)) => {
                debug!(ip = %addr, error = %e, "reverse lookup failed");
                None
            }
            Err(_) => {
                debug!(ip = %addr, "reverse lookup timed out");
                None
            }
        }
    }
}
