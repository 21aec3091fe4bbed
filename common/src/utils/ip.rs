use std::net::Ipv4Addr;

/// Builds the reverse lookup name for an address, e.g. `1.1.168.192.in-addr.arpa`.
pub fn reverse_address_to_ptr(ip_addr: &Ipv4Addr) -> String {
    let [a, b, c, d] = ip_addr.octets();
    format!("{d}.{c}.{b}.{a}.in-addr.arpa")
}
