use std::process::ExitCode;

use colored::*;
use netsweep_common::config::Config;
use netsweep_common::network::interface::LocalAddress;
use netsweep_common::network::range::SubnetRange;
use netsweep_core::network::{SystemInterfaces, system_nameserver};
use netsweep_core::ports::LocalAddressSource;

use crate::terminal::{colors, print};

/// Shows what a sweep would cover without sending anything.
pub fn info(cfg: &Config) -> anyhow::Result<ExitCode> {
    let Some(local) = SystemInterfaces.local_address(cfg.interface.as_deref()) else {
        let message: String = match &cfg.interface {
            Some(name) => format!("Interface '{name}' is not up or has no IPv4 address"),
            None => "No active interface with an IPv4 address".to_string(),
        };
        print::print_status(message.red().bold().to_string());
        return Ok(ExitCode::FAILURE);
    };

    let subnet = SubnetRange::around(local.addr);
    print::GLOBAL_KEY_WIDTH.set(10);

    print::aligned_line("Interface", local.interface.clone());
    print::aligned_line("Address", address_value(&local));
    print::aligned_line("Range", subnet.to_string().color(colors::IPV4_ADDR));
    print::aligned_line("Candidates", subnet.len().to_string());
    print::aligned_line("Nameserver", nameserver_value(cfg));

    Ok(ExitCode::SUCCESS)
}

fn address_value(local: &LocalAddress) -> ColoredString {
    format!(
        "{}{}",
        local.addr.to_string().color(colors::IPV4_ADDR),
        format!("/{}", local.prefix).color(colors::IPV4_PREFIX)
    )
    .normal()
}

fn nameserver_value(cfg: &Config) -> ColoredString {
    if cfg.no_dns {
        return "disabled".dimmed();
    }
    if let Some(server) = cfg.dns_server {
        return server.to_string().color(colors::IPV4_ADDR);
    }
    match system_nameserver() {
        Ok(server) => server.to_string().color(colors::IPV4_ADDR),
        Err(e) => format!("none ({e})").dimmed(),
    }
}
