use std::net::Ipv4Addr;

use anyhow::{Context, anyhow, ensure};
use dns_parser::{Packet as DnsMessage, RData, ResponseCode};
use pnet::packet::dns::{DnsClass, DnsTypes, MutableDnsPacket, Opcode, Retcode};

use netsweep_common::utils::ip;

pub const DNS_HDR_LEN: usize = 12;
const QUESTION_FIXED_LEN: usize = 4;

/// Builds a recursive PTR query for `ip_addr` with transaction id `id`.
pub fn create_ptr_packet(ip_addr: &Ipv4Addr, id: u16) -> anyhow::Result<Vec<u8>> {
    let qname: Vec<u8> = encode_dns_name(&ip::reverse_address_to_ptr(ip_addr));
    let total: usize = DNS_HDR_LEN + qname.len() + QUESTION_FIXED_LEN;
    let mut buffer: Vec<u8> = vec![0u8; total];

    {
        let mut dns: MutableDnsPacket =
            MutableDnsPacket::new(&mut buffer).context("creating dns header")?;
        dns.set_id(id);
        dns.set_is_response(0);
        dns.set_opcode(Opcode::StandardQuery);
        dns.set_is_recursion_desirable(1);
        dns.set_rcode(Retcode::NoError);
        dns.set_query_count(1);
        dns.set_response_count(0);
        dns.set_authority_rr_count(0);
        dns.set_additional_rr_count(0);
    }

    let mut cursor: usize = DNS_HDR_LEN;
    buffer[cursor..cursor + qname.len()].copy_from_slice(&qname);
    cursor += qname.len();

    buffer[cursor..cursor + 2].copy_from_slice(&DnsTypes::PTR.0.to_be_bytes());
    cursor += 2;
    buffer[cursor..cursor + 2].copy_from_slice(&DnsClass(1).0.to_be_bytes());

    Ok(buffer)
}

/// Reads a PTR response and returns its transaction id and the first host name,
/// without the trailing root dot.
///
/// NXDOMAIN, any other error code and answer-less responses are errors.
pub fn get_hostname(payload: &[u8]) -> anyhow::Result<(u16, String)> {
    let message = DnsMessage::parse(payload).map_err(|e| anyhow!("malformed DNS response: {e}"))?;
    ensure!(!message.header.query, "DNS packet is a query, not a response");
    ensure!(
        matches!(message.header.response_code, ResponseCode::NoError),
        "reverse lookup failed: {:?}",
        message.header.response_code
    );

    let hostname = message
        .answers
        .iter()
        .find_map(|answer| match &answer.data {
            RData::PTR(ptr) => Some(ptr.0.to_string()),
            _ => None,
        })
        .ok_or_else(|| anyhow!("no PTR record in response"))?;

    let hostname = hostname.trim_end_matches('.');
    ensure!(!hostname.is_empty(), "PTR record holds an empty name");

    Ok((message.header.id, hostname.to_string()))
}

fn encode_dns_name(name: &str) -> Vec<u8> {
    let mut encoded: Vec<u8> = Vec::new();
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    encoded
}
