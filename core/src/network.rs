//! Adapters binding the [`crate::ports`] to the operating system.

mod icmp;
mod interface;
mod resolver;

pub use icmp::IcmpPinger;
pub use interface::SystemInterfaces;
pub use resolver::{DnsResolver, system_nameserver};
