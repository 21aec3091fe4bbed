use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use netsweep_common::config::Config;
use netsweep_common::network::device::DeviceInfo;
use netsweep_common::network::interface::LocalAddress;
use netsweep_core::DiscoveryCoordinator;
use netsweep_core::ports::{LocalAddressSource, NameResolver, Pinger, ScanObserver};

pub fn wlan0(addr: Ipv4Addr) -> LocalAddress {
    LocalAddress {
        interface: "wlan0".to_string(),
        addr,
        prefix: 24,
    }
}

/// Interface table with at most one usable address.
pub struct StaticAddress(pub Option<LocalAddress>);

impl LocalAddressSource for StaticAddress {
    fn local_address(&self, only: Option<&str>) -> Option<LocalAddress> {
        self.0
            .clone()
            .filter(|local| only.is_none_or(|name| name == local.interface))
    }
}

/// Answers only for scripted addresses; everything else fails right away.
#[derive(Default)]
pub struct ScriptedPinger {
    replies: Mutex<HashMap<Ipv4Addr, Duration>>,
    delay: Duration,
    probed: Mutex<Vec<Ipv4Addr>>,
}

impl ScriptedPinger {
    pub fn new(replies: &[(Ipv4Addr, Duration)]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().copied().collect()),
            ..Self::default()
        }
    }

    /// Every echo waits `delay` before it is answered or rejected.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_reply(&self, addr: Ipv4Addr, rtt: Option<Duration>) {
        let mut replies = self.replies.lock().unwrap();
        match rtt {
            Some(rtt) => replies.insert(addr, rtt),
            None => replies.remove(&addr),
        };
    }

    pub fn probed(&self) -> Vec<Ipv4Addr> {
        self.probed.lock().unwrap().clone()
    }

    pub fn clear_probed(&self) {
        self.probed.lock().unwrap().clear();
    }
}

#[async_trait]
impl Pinger for ScriptedPinger {
    async fn echo(&self, addr: Ipv4Addr) -> anyhow::Result<Duration> {
        self.probed.lock().unwrap().push(addr);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.replies.lock().unwrap().get(&addr).copied();
        match reply {
            Some(rtt) => Ok(rtt),
            None => bail!("request timed out"),
        }
    }
}

#[derive(Default)]
pub struct MapResolver {
    names: HashMap<Ipv4Addr, String>,
    lookups: AtomicUsize,
}

impl MapResolver {
    pub fn new(names: &[(Ipv4Addr, &str)]) -> Self {
        Self {
            names: names
                .iter()
                .map(|(addr, name)| (*addr, name.to_string()))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameResolver for MapResolver {
    async fn reverse_lookup(&self, addr: Ipv4Addr) -> anyhow::Result<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.names.get(&addr) {
            Some(name) => Ok(name.clone()),
            None => bail!("NXDOMAIN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started,
    Found(Ipv4Addr),
    Finished,
    Fatal(String),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
    progress: Mutex<Vec<(usize, usize)>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.progress.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
        self.progress.lock().unwrap().clear();
    }
}

impl ScanObserver for RecordingObserver {
    fn on_scan_started(&self) {
        self.events.lock().unwrap().push(Event::Started);
    }

    fn on_device_found(&self, device: &DeviceInfo) {
        self.events.lock().unwrap().push(Event::Found(device.ip()));
    }

    fn on_scan_finished(&self) {
        self.events.lock().unwrap().push(Event::Finished);
    }

    fn on_fatal_error(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Fatal(message.to_string()));
    }

    fn on_probe_complete(&self, done: usize, total: usize) {
        self.progress.lock().unwrap().push((done, total));
    }
}

/// A scripted network around one host, plus handles to inspect what happened.
pub struct Harness {
    pub coordinator: Arc<DiscoveryCoordinator>,
    pub pinger: Arc<ScriptedPinger>,
    pub resolver: Arc<MapResolver>,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    pub fn new(
        cfg: Config,
        local: Option<LocalAddress>,
        pinger: ScriptedPinger,
        resolver: MapResolver,
    ) -> Self {
        let pinger = Arc::new(pinger);
        let resolver = Arc::new(resolver);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = DiscoveryCoordinator::new(
            cfg,
            Box::new(StaticAddress(local)),
            pinger.clone(),
            Some(resolver.clone() as Arc<dyn NameResolver>),
            observer.clone(),
        )
        .expect("valid configuration");

        Self {
            coordinator: Arc::new(coordinator),
            pinger,
            resolver,
            observer,
        }
    }
}

/// Records whether the coordinator still reported a running scan while each
/// lifecycle notification was being delivered.
#[derive(Default)]
pub struct StateObserver {
    coordinator: OnceLock<Weak<DiscoveryCoordinator>>,
    seen: Mutex<Vec<(&'static str, bool)>>,
}

impl StateObserver {
    pub fn attach(&self, coordinator: &Arc<DiscoveryCoordinator>) {
        let _ = self.coordinator.set(Arc::downgrade(coordinator));
    }

    pub fn seen(&self) -> Vec<(&'static str, bool)> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self, event: &'static str) {
        let scanning = self
            .coordinator
            .get()
            .and_then(Weak::upgrade)
            .is_some_and(|coordinator| coordinator.is_scanning());
        self.seen.lock().unwrap().push((event, scanning));
    }
}

impl ScanObserver for StateObserver {
    fn on_scan_started(&self) {
        self.record("started");
    }

    fn on_device_found(&self, _device: &DeviceInfo) {}

    fn on_scan_finished(&self) {
        self.record("finished");
    }

    fn on_fatal_error(&self, _message: &str) {
        self.record("fatal");
    }
}

/// Coordinator whose observer checks its state from inside the callbacks.
pub fn observed_by_state(
    cfg: Config,
    local: Option<LocalAddress>,
    pinger: ScriptedPinger,
) -> (Arc<DiscoveryCoordinator>, Arc<StateObserver>) {
    let observer = Arc::new(StateObserver::default());
    let coordinator = DiscoveryCoordinator::new(
        cfg,
        Box::new(StaticAddress(local)),
        Arc::new(pinger),
        None,
        observer.clone(),
    )
    .expect("valid configuration");
    let coordinator = Arc::new(coordinator);
    observer.attach(&coordinator);
    (coordinator, observer)
}
