use colored::*;
use netsweep_common::network::device::{DeviceInfo, MacAddress};

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

const FAST_MS: u64 = 10;
const SLOW_MS: u64 = 100;

pub fn device_to_details(device: &DeviceInfo) -> Vec<Detail> {
    vec![
        (
            "IPv4".to_string(),
            device.ip().to_string().color(colors::IPV4_ADDR),
        ),
        ("MAC".to_string(), mac_to_value(&device.mac())),
        ("RTT".to_string(), latency_to_value(device.response_time_ms())),
    ]
}

pub fn mac_to_value(mac: &MacAddress) -> ColoredString {
    match mac {
        MacAddress::Known(_) => mac.to_string().color(colors::MAC_ADDR),
        MacAddress::Unknown => mac.to_string().dimmed(),
    }
}

pub fn latency_to_value(ms: u64) -> ColoredString {
    let text: String = format!("{ms} ms");
    match ms {
        ms if ms < FAST_MS => text.color(colors::LATENCY_FAST),
        ms if ms < SLOW_MS => text.color(colors::LATENCY_SLOW),
        _ => text.color(colors::LATENCY_LAGGY),
    }
}

/// One-line rendering used while the scan is still running.
pub fn device_line(device: &DeviceInfo) -> String {
    let hostname: ColoredString = if device.is_hostname_resolved() {
        device.hostname().color(colors::HOSTNAME)
    } else {
        device.hostname().dimmed()
    };
    format!(
        "{} {} {}",
        format!("{:<15}", device.ip()).color(colors::IPV4_ADDR),
        hostname,
        format!("({})", latency_to_value(device.response_time_ms())).color(colors::SEPARATOR)
    )
}
