use std::fmt;
use std::net::Ipv4Addr;

/// Last octet of the first probed host.
pub const FIRST_HOST_OCTET: u8 = 1;
/// Last octet of the final probed host. `.0` and `.255` are never probed.
pub const LAST_HOST_OCTET: u8 = 254;

/// An inclusive range of IPv4 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        end.checked_sub(start).map_or(0, |span| span as usize + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn contains(&self, addr: Ipv4Addr) -> bool {
        self.start_addr <= addr && addr <= self.end_addr
    }
}

/// The candidate hosts of a sweep: every `a.b.c.1` through `a.b.c.254`
/// sharing the first three octets of the local address.
///
/// The interface's real netmask is deliberately ignored; sweeps are always /24.
/// The local address itself is part of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetRange {
    local: Ipv4Addr,
    hosts: Ipv4Range,
}

impl SubnetRange {
    pub fn around(local: Ipv4Addr) -> Self {
        let [a, b, c, _] = local.octets();
        let hosts = Ipv4Range::new(
            Ipv4Addr::new(a, b, c, FIRST_HOST_OCTET),
            Ipv4Addr::new(a, b, c, LAST_HOST_OCTET),
        );
        Self { local, hosts }
    }

    #[cfg(test)]
    fn local(&self) -> Ipv4Addr {
        self.local
    }

    /// The shared `a.b.c` prefix.
    pub fn prefix(&self) -> String {
        let [a, b, c, _] = self.local.octets();
        format!("{a}.{b}.{c}")
    }

    /// Candidates in ascending order. Restartable: each call yields a fresh iterator.
    pub fn iter(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        self.hosts.to_iter()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, addr: Ipv4Addr) -> bool {
        self.hosts.contains(addr)
    }
}

impl fmt::Display for SubnetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{FIRST_HOST_OCTET}-{LAST_HOST_OCTET}",
            self.prefix()
        )
    }
}
