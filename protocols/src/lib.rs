//! Wire formats spoken by the sweep: ICMP echo and DNS PTR.

pub mod dns;
pub mod icmp;
