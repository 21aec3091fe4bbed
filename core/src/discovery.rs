//! # Network Discovery Service
//!
//! Implements the "sweep the local subnet" use case.
//!
//! The coordinator resolves the local address, derives the /24 around it and
//! pushes every candidate through a [`HostProber`], appending each responsive
//! host to the [`DeviceRegistry`] the moment it is confirmed.
//!
//! State machine: `Idle -> Scanning -> Idle`. A scan request while scanning is
//! rejected with [`ScanError::AlreadyScanning`]; [`DiscoveryCoordinator::stop`]
//! cancels the running scan.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use netsweep_common::ScanError;
use netsweep_common::config::Config;
use netsweep_common::network::device::DeviceInfo;
use netsweep_common::network::interface::LocalAddress;
use netsweep_common::network::range::SubnetRange;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::network::{DnsResolver, IcmpPinger, SystemInterfaces};
use crate::ports::{LocalAddressSource, NameResolver, Pinger, ScanObserver};
use crate::prober::{HostProber, ProbeOutcome};
use crate::registry::DeviceRegistry;

/// Summary of a finished (or stopped) scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub local: LocalAddress,
    pub subnet: SubnetRange,
    /// Responsive hosts, sorted by address.
    pub devices: Vec<DeviceInfo>,
    /// Number of candidates whose probe completed.
    pub probed: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

enum ScanState {
    Idle,
    Scanning { cancel: watch::Sender<bool> },
}

/// Returns the coordinator to `Idle` however the scan ends, including a
/// cancelled or panicking `start_scan` future.
struct ScanGuard<'a>(&'a Mutex<ScanState>);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = ScanState::Idle;
    }
}

pub struct DiscoveryCoordinator {
    cfg: Config,
    addresses: Box<dyn LocalAddressSource>,
    prober: Arc<HostProber>,
    observer: Arc<dyn ScanObserver>,
    registry: DeviceRegistry,
    state: Mutex<ScanState>,
}

impl DiscoveryCoordinator {
    pub fn new(
        cfg: Config,
        addresses: Box<dyn LocalAddressSource>,
        pinger: Arc<dyn Pinger>,
        resolver: Option<Arc<dyn NameResolver>>,
        observer: Arc<dyn ScanObserver>,
    ) -> Result<Self, ScanError> {
        cfg.validate()?;
        let prober = Arc::new(HostProber::new(pinger, resolver, &cfg));
        Ok(Self {
            cfg,
            addresses,
            prober,
            observer,
            registry: DeviceRegistry::new(),
            state: Mutex::new(ScanState::Idle),
        })
    }

    /// Wires the coordinator to the real interface table, a raw ICMP socket and
    /// the configured nameserver.
    ///
    /// Fails with [`ScanError::Socket`] when the ICMP socket cannot be opened.
    /// A missing nameserver only disables reverse lookups.
    pub fn with_system_adapters(
        cfg: Config,
        observer: Arc<dyn ScanObserver>,
    ) -> Result<Self, ScanError> {
        cfg.validate()?;
        let pinger: Arc<dyn Pinger> = Arc::new(IcmpPinger::new()?);

        let resolver: Option<Arc<dyn NameResolver>> = if cfg.no_dns {
            None
        } else {
            match DnsResolver::from_config(&cfg) {
                Ok(resolver) => {
                    debug!(server = %resolver.server(), "using nameserver for reverse lookups");
                    Some(Arc::new(resolver))
                }
                Err(e) => {
                    warn!("Reverse lookups disabled: {e:#}");
                    None
                }
            }
        };

        Self::new(cfg, Box::new(SystemInterfaces), pinger, resolver, observer)
    }

    pub fn is_scanning(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            ScanState::Scanning { .. }
        )
    }

    /// Copy of the registry as it stands, usable while a scan is running.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.registry.snapshot()
    }

    /// Cancels the running scan. Returns `false` when there was nothing to stop.
    pub fn stop(&self) -> bool {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            ScanState::Scanning { cancel } => {
                cancel.send_replace(true);
                info!("Stopping scan");
                true
            }
            ScanState::Idle => false,
        }
    }

    /// Runs one full sweep and returns once every candidate has been probed or
    /// the scan was stopped.
    ///
    /// Only a configuration failure (no usable local address) is reported as an
    /// error, both to the observer and to the caller.
    pub async fn start_scan(&self) -> Result<ScanReport, ScanError> {
        let mut cancel_rx = self.enter_scanning()?;
        let guard = ScanGuard(&self.state);
        let start_time = Instant::now();

        self.registry.clear();
        self.observer.on_scan_started();

        let local: LocalAddress = match self.resolve_local_address() {
            Ok(local) => local,
            Err(e) => {
                error!("{e}");
                drop(guard);
                self.observer.on_fatal_error(&e.to_string());
                return Err(e);
            }
        };

        let subnet = SubnetRange::around(local.addr);
        info!(local = %local, range = %subnet, "Starting discovery scan");

        let (probed, cancelled) = self.sweep(&subnet, &mut cancel_rx).await;

        let mut devices: Vec<DeviceInfo> = self.registry.snapshot();
        devices.sort_by_key(DeviceInfo::ip);

        info!(
            found = devices.len(),
            probed,
            cancelled,
            "Scan complete"
        );
        // Idle before the consumer hears about it, so it may rescan right away.
        drop(guard);
        self.observer.on_scan_finished();

        Ok(ScanReport {
            local,
            subnet,
            devices,
            probed,
            elapsed: start_time.elapsed(),
            cancelled,
        })
    }

    fn enter_scanning(&self) -> Result<watch::Receiver<bool>, ScanError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, ScanState::Scanning { .. }) {
            warn!("Scan request ignored: a scan is already running");
            return Err(ScanError::AlreadyScanning);
        }
        let (cancel, cancel_rx) = watch::channel(false);
        *state = ScanState::Scanning { cancel };
        Ok(cancel_rx)
    }

    fn resolve_local_address(&self) -> Result<LocalAddress, ScanError> {
        let only: Option<&str> = self.cfg.interface.as_deref();
        self.addresses
            .local_address(only)
            .ok_or_else(|| match only {
                Some(name) => ScanError::InterfaceNotFound(name.to_string()),
                None => ScanError::NoLocalAddress,
            })
    }

    /// Dispatches candidates through a pool of at most `concurrency` probes.
    ///
    /// Returns the number of completed probes and whether the sweep was cancelled.
    async fn sweep(
        &self,
        subnet: &SubnetRange,
        cancel_rx: &mut watch::Receiver<bool>,
    ) -> (usize, bool) {
        let total: usize = subnet.len();
        let mut candidates = subnet.iter();
        let mut in_flight: JoinSet<(Ipv4Addr, ProbeOutcome)> = JoinSet::new();
        let mut done: usize = 0;

        loop {
            while in_flight.len() < self.cfg.concurrency {
                let Some(ip) = candidates.next() else { break };
                let prober = Arc::clone(&self.prober);
                in_flight.spawn(async move { (ip, prober.probe(ip).await) });
            }

            if in_flight.is_empty() {
                return (done, false);
            }

            tokio::select! {
                biased;

                _ = cancelled(cancel_rx) => {
                    in_flight.abort_all();
                    return (done, true);
                }

                Some(joined) = in_flight.join_next() => {
                    done += 1;
                    match joined {
                        Ok((_, ProbeOutcome::Found(device))) => self.record(device),
                        Ok((ip, ProbeOutcome::Unreachable)) => debug!(ip = %ip, "no reply"),
                        Err(e) => warn!(error = %e, "probe task failed"),
                    }
                    self.observer.on_probe_complete(done, total);
                }
            }
        }
    }

    fn record(&self, device: DeviceInfo) {
        info!(ip = %device.ip(), hostname = device.hostname(), "Found device");
        self.registry.push(device.clone());
        self.observer.on_device_found(&device);
    }
}

/// Resolves once cancellation is requested. Never resolves if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
