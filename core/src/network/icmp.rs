//! ICMPv4 echo over a raw socket.
//!
//! One transport channel is shared by every probe. A listener thread reads
//! replies and hands each one to the probe waiting on its sequence number.
//!
//! Opening the channel requires root or `CAP_NET_RAW`.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use netsweep_common::ScanError;
use netsweep_protocols::icmp::{self, EchoId};
use pnet::packet::Packet;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::{
    self, TransportChannelType, TransportProtocol, TransportReceiver, TransportSender,
};
use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::ports::Pinger;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));
/// How often the listener wakes up to check whether the pinger was dropped.
const LISTENER_POLL: Duration = Duration::from_millis(100);

type PendingMap = Arc<Mutex<HashMap<u16, (Ipv4Addr, oneshot::Sender<Instant>)>>>;

pub struct IcmpPinger {
    tx: Arc<Mutex<TransportSender>>,
    identifier: u16,
    sequence: AtomicU16,
    pending: PendingMap,
    shutdown: Arc<AtomicBool>,
}

impl IcmpPinger {
    pub fn new() -> Result<Self, ScanError> {
        let (tx, rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_ICMP)?;
        let identifier: u16 = rand::random();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        {
            let pending = Arc::clone(&pending);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("icmp-listener".to_string())
                .spawn(move || listen(rx, identifier, pending, shutdown))?;
        }

        Ok(Self {
            tx: Arc::new(Mutex::new(tx)),
            identifier,
            sequence: AtomicU16::new(0),
            pending,
            shutdown,
        })
    }

    fn next_id(&self) -> EchoId {
        EchoId {
            identifier: self.identifier,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Drop for IcmpPinger {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl Pinger for IcmpPinger {
    async fn echo(&self, addr: Ipv4Addr) -> anyhow::Result<Duration> {
        let id: EchoId = self.next_id();
        let bytes: Vec<u8> = icmp::create_echo_request(id)?;

        // Registered before sending so a fast reply cannot be missed.
        let (reply_tx, reply_rx) = oneshot::channel();
        let _pending = PendingEntry::register(&self.pending, id.sequence, addr, reply_tx);

        let tx = Arc::clone(&self.tx);
        let sent_at: Instant = tokio::task::spawn_blocking(move || -> anyhow::Result<Instant> {
            let packet = IcmpPacket::new(&bytes).context("creating icmp packet")?;
            let mut sender = tx
                .lock()
                .map_err(|_| anyhow!("ICMP sender lock poisoned"))?;
            let sent_at = Instant::now();
            sender
                .send_to(packet, IpAddr::V4(addr))
                .context("sending echo request")?;
            Ok(sent_at)
        })
        .await??;

        let received_at: Instant = reply_rx.await.context("ICMP listener stopped")?;
        Ok(received_at.saturating_duration_since(sent_at))
    }
}

/// Removes the waiter when the probe finishes or is dropped on timeout.
struct PendingEntry<'a> {
    pending: &'a PendingMap,
    sequence: u16,
}

impl<'a> PendingEntry<'a> {
    fn register(
        pending: &'a PendingMap,
        sequence: u16,
        addr: Ipv4Addr,
        reply_tx: oneshot::Sender<Instant>,
    ) -> Self {
        lock(pending).insert(sequence, (addr, reply_tx));
        Self { pending, sequence }
    }
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.sequence);
    }
}

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<u16, (Ipv4Addr, oneshot::Sender<Instant>)>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

fn listen(
    mut rx: TransportReceiver,
    identifier: u16,
    pending: PendingMap,
    shutdown: Arc<AtomicBool>,
) {
    let mut iterator = transport::icmp_packet_iter(&mut rx);

    while !shutdown.load(Ordering::Relaxed) {
        let (packet, source) = match iterator.next_with_timeout(LISTENER_POLL) {
            Ok(Some(received)) => received,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "ICMP receive failed");
                thread::sleep(LISTENER_POLL);
                continue;
            }
        };
        route_reply(&pending, identifier, source, packet.packet(), Instant::now());
    }
}

/// Hands an incoming ICMP packet to the probe waiting for it.
///
/// A reply is delivered only when it carries this pinger's identifier, a
/// sequence number still pending, and comes from the address that sequence was
/// sent to. Returns whether a waiter was woken.
fn route_reply(
    pending: &PendingMap,
    identifier: u16,
    source: IpAddr,
    bytes: &[u8],
    received_at: Instant,
) -> bool {
    let Ok(reply) = icmp::parse_echo_reply(bytes) else {
        return false;
    };
    if reply.identifier != identifier {
        return false;
    }

    let mut waiting = lock(pending);
    let matches_target = waiting
        .get(&reply.sequence)
        .is_some_and(|(target, _)| IpAddr::V4(*target) == source);
    if !matches_target {
        trace!(%source, sequence = reply.sequence, "unexpected echo reply");
        return false;
    }
    match waiting.remove(&reply.sequence) {
        Some((_, waiter)) => waiter.send(received_at).is_ok(),
        None => false,
    }
}
