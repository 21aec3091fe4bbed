use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};

use anyhow::{Context, ensure};
use async_trait::async_trait;
use netsweep_common::config::Config;
use netsweep_protocols::dns;
use tokio::net::UdpSocket;

use crate::ports::NameResolver;

const DNS_PORT: u16 = 53;
const DNS_UDP_MAX: usize = 512;
const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Reverse lookups against a single recursive nameserver over UDP.
///
/// Each lookup uses its own ephemeral socket and a fresh transaction id; the
/// prober enforces the timeout.
pub struct DnsResolver {
    server: SocketAddr,
    id_counter: AtomicU16,
}

impl DnsResolver {
    pub fn new(server: IpAddr) -> Self {
        Self {
            server: SocketAddr::new(server, DNS_PORT),
            id_counter: AtomicU16::new(rand::random()),
        }
    }

    /// Uses `dns_server` from the configuration, else the system nameserver.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let server: IpAddr = match cfg.dns_server {
            Some(server) => server,
            None => system_nameserver()?,
        };
        Ok(Self::new(server))
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    fn get_next_trans_id(&self) -> u16 {
        self.id_counter.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl NameResolver for DnsResolver {
    async fn reverse_lookup(&self, addr: Ipv4Addr) -> anyhow::Result<String> {
        let id: u16 = self.get_next_trans_id();
        let query: Vec<u8> = dns::create_ptr_packet(&addr, id)?;

        let bind_addr = if self.server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .context("binding DNS socket")?;
        socket
            .connect(self.server)
            .await
            .with_context(|| format!("connecting to nameserver {}", self.server))?;
        socket.send(&query).await.context("sending PTR query")?;

        let mut buffer = [0u8; DNS_UDP_MAX];
        let len: usize = socket.recv(&mut buffer).await.context("receiving PTR response")?;

        let (response_id, hostname) = dns::get_hostname(&buffer[..len])?;
        ensure!(
            response_id == id,
            "transaction id mismatch (sent {id}, got {response_id})"
        );
        Ok(hostname)
    }
}

/// First usable `nameserver` entry of `/etc/resolv.conf`.
pub fn system_nameserver() -> anyhow::Result<IpAddr> {
    let contents: String =
        std::fs::read_to_string(RESOLV_CONF).with_context(|| format!("reading {RESOLV_CONF}"))?;
    parse_resolv_conf(&contents).with_context(|| format!("no nameserver in {RESOLV_CONF}"))
}

fn parse_resolv_conf(contents: &str) -> Option<IpAddr> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && !line.starts_with(';'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("nameserver") => fields.next()?.parse::<IpAddr>().ok(),
                _ => None,
            }
        })
        .next()
}
