use anyhow::{Context, ensure};
use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::{IcmpCodes, MutableEchoRequestPacket};
use pnet::packet::icmp::{self, IcmpPacket, IcmpTypes, MutableIcmpPacket};

pub const ICMP_ECHO_HDR_LEN: usize = 8;
const ECHO_PAYLOAD: &[u8; 32] = b"abcdefghijklmnopqrstuvwabcdefghi";

/// Identity of an echo reply, used to route it back to the probe that sent the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EchoId {
    pub identifier: u16,
    pub sequence: u16,
}

/// Builds an ICMPv4 echo request (header + payload, no IP header).
pub fn create_echo_request(id: EchoId) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ICMP_ECHO_HDR_LEN + ECHO_PAYLOAD.len()];

    {
        let mut echo: MutableEchoRequestPacket = MutableEchoRequestPacket::new(&mut buffer)
            .context("creating echo request packet")?;
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCodes::NoCode);
        echo.set_identifier(id.identifier);
        echo.set_sequence_number(id.sequence);
        echo.set_payload(ECHO_PAYLOAD);
    }

    let mut icmp: MutableIcmpPacket =
        MutableIcmpPacket::new(&mut buffer).context("creating icmp packet")?;
    icmp.set_checksum(0);
    let csm: u16 = icmp::checksum(&icmp.to_immutable());
    icmp.set_checksum(csm);

    Ok(buffer)
}

/// Extracts the identity of an echo reply. Any other ICMP message is an error.
pub fn parse_echo_reply(bytes: &[u8]) -> anyhow::Result<EchoId> {
    let icmp: IcmpPacket = IcmpPacket::new(bytes).context("truncated ICMP packet")?;
    ensure!(
        icmp.get_icmp_type() == IcmpTypes::EchoReply,
        "not an echo reply (type {})",
        icmp.get_icmp_type().0
    );
    let reply: EchoReplyPacket =
        EchoReplyPacket::new(icmp.packet()).context("truncated echo reply")?;
    Ok(EchoId {
        identifier: reply.get_identifier(),
        sequence: reply.get_sequence_number(),
    })
}
