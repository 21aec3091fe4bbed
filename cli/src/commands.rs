pub mod discover;
pub mod info;

use std::net::IpAddr;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use netsweep_common::config::{Config, DEFAULT_CONCURRENCY};

#[derive(Parser)]
#[command(name = "netsweep")]
#[command(version, about = "Finds live hosts on the local /24.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Skip reverse DNS lookups
    #[arg(long, global = true)]
    pub no_dns: bool,

    /// Nameserver for reverse lookups (default: first entry of /etc/resolv.conf)
    #[arg(long, global = true, value_name = "IP")]
    pub dns_server: Option<IpAddr>,

    /// Reverse lookup timeout
    #[arg(long, global = true, value_name = "MS", default_value_t = 1_000)]
    pub dns_timeout: u64,

    /// Only consider this interface when resolving the local address
    #[arg(short, long, global = true, value_name = "NAME")]
    pub interface: Option<String>,

    /// Echo reply timeout per address
    #[arg(short, long, global = true, value_name = "MS", default_value_t = 500)]
    pub timeout: u64,

    /// Probes in flight at once (1 = sequential)
    #[arg(short, long, global = true, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Reduce output (-q: no live results, -qq: summary only)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    /// Show engine logs (-v: info, -vv: debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the local address and the range a sweep would cover
    #[command(alias = "i")]
    Info,
    /// Discover live hosts on the local /24
    #[command(alias = "d")]
    Discover,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn to_config(&self) -> Config {
        Config {
            probe_timeout: Duration::from_millis(self.timeout),
            concurrency: self.concurrency,
            no_dns: self.no_dns,
            dns_server: self.dns_server,
            dns_timeout: Duration::from_millis(self.dns_timeout),
            interface: self.interface.clone(),
            quiet: self.quiet.min(2),
        }
    }
}
