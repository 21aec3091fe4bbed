use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use netsweep_common::ScanError;
use netsweep_common::config::Config;
use netsweep_common::network::device::DeviceInfo;
use netsweep_common::network::range::SubnetRange;

use super::fakes::{Event, Harness, MapResolver, ScriptedPinger, observed_by_state, wlan0};

const LOCAL: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 42);
const GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
const PRINTER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 50);
const NAS: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 200);

fn config(concurrency: usize) -> Config {
    Config {
        concurrency,
        probe_timeout: Duration::from_millis(200),
        dns_timeout: Duration::from_millis(200),
        ..Config::default()
    }
}

fn ips(devices: &[DeviceInfo]) -> Vec<Ipv4Addr> {
    devices.iter().map(DeviceInfo::ip).collect()
}

/// Polls until the pinger has seen `n` requests.
async fn wait_for_probes(harness: &Harness, n: usize) {
    while harness.pinger.probed().len() < n {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/*************************************************************
                       Full sweeps
**************************************************************/

#[tokio::test]
async fn finds_the_gateway_on_a_quiet_subnet() {
    let harness = Harness::new(
        config(32),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&[(GATEWAY, Duration::from_millis(3))]),
        MapResolver::new(&[(GATEWAY, "router.lan")]),
    );

    let report = harness.coordinator.start_scan().await.unwrap();

    assert_eq!(report.devices.len(), 1);
    let router = &report.devices[0];
    assert_eq!(router.ip(), GATEWAY);
    assert_eq!(router.hostname(), "router.lan");
    assert_eq!(router.response_time_ms(), 3);
    assert_eq!(router.mac().to_string(), "N/A");

    assert_eq!(report.local.addr, LOCAL);
    assert_eq!(report.subnet, SubnetRange::around(LOCAL));
    assert_eq!(report.probed, 254);
    assert!(!report.cancelled);

    assert_eq!(
        harness.observer.events(),
        vec![Event::Started, Event::Found(GATEWAY), Event::Finished]
    );
    assert_eq!(harness.coordinator.devices(), report.devices);
    assert!(!harness.coordinator.is_scanning());
}

#[tokio::test]
async fn probes_every_host_address_exactly_once() {
    let harness = Harness::new(
        config(16),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&[]),
        MapResolver::default(),
    );

    let report = harness.coordinator.start_scan().await.unwrap();
    let probed = harness.pinger.probed();
    let unique: BTreeSet<Ipv4Addr> = probed.iter().copied().collect();

    assert_eq!(probed.len(), 254);
    assert_eq!(unique.len(), 254);
    assert!(!unique.contains(&Ipv4Addr::new(192, 168, 1, 0)));
    assert!(!unique.contains(&Ipv4Addr::new(192, 168, 1, 255)));
    // the local address is swept like any other
    assert!(unique.contains(&LOCAL));
    assert!(report.devices.is_empty());
    assert_eq!(harness.observer.progress().last(), Some(&(254, 254)));
}

#[tokio::test]
async fn reachable_hosts_are_listed_once_and_unreachable_ones_never() {
    let replies = [
        (GATEWAY, Duration::from_millis(1)),
        (PRINTER, Duration::from_millis(12)),
        (NAS, Duration::from_millis(140)),
    ];
    let harness = Harness::new(
        config(64),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&replies),
        MapResolver::new(&[(GATEWAY, "router.lan"), (NAS, "nas.lan")]),
    );

    let report = harness.coordinator.start_scan().await.unwrap();

    assert_eq!(ips(&report.devices), vec![GATEWAY, PRINTER, NAS]);
    for device in &report.devices {
        assert!(!device.mac().is_known());
        assert_eq!(device.mac().to_string(), "N/A");
    }
    assert_eq!(harness.observer.count(|e| matches!(e, Event::Found(_))), 3);
    assert_eq!(harness.resolver.lookups(), 3);
}

#[tokio::test]
async fn failed_reverse_lookup_reports_unknown_hostname() {
    let harness = Harness::new(
        config(8),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&[
            (GATEWAY, Duration::from_millis(2)),
            (PRINTER, Duration::from_millis(4)),
        ]),
        MapResolver::new(&[(GATEWAY, "router.lan")]),
    );

    let report = harness.coordinator.start_scan().await.unwrap();

    let printer = report.devices.iter().find(|d| d.ip() == PRINTER).unwrap();
    assert_eq!(printer.hostname(), "Unknown");
    assert!(!printer.is_hostname_resolved());
    assert_eq!(printer.response_time_ms(), 4);
}

#[tokio::test]
async fn disabled_dns_skips_every_lookup() {
    let cfg = Config {
        no_dns: true,
        ..config(8)
    };
    let harness = Harness::new(
        cfg,
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&[(GATEWAY, Duration::from_millis(2))]),
        MapResolver::new(&[(GATEWAY, "router.lan")]),
    );

    let report = harness.coordinator.start_scan().await.unwrap();

    assert_eq!(report.devices[0].hostname(), "Unknown");
    assert_eq!(harness.resolver.lookups(), 0);
}

#[tokio::test]
async fn rescan_replaces_previous_results() {
    let harness = Harness::new(
        config(32),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&[
            (GATEWAY, Duration::from_millis(1)),
            (PRINTER, Duration::from_millis(1)),
        ]),
        MapResolver::default(),
    );

    let first = harness.coordinator.start_scan().await.unwrap();
    assert_eq!(ips(&first.devices), vec![GATEWAY, PRINTER]);

    harness.pinger.set_reply(PRINTER, None);
    harness.pinger.set_reply(NAS, Some(Duration::from_millis(1)));

    let second = harness.coordinator.start_scan().await.unwrap();
    assert_eq!(ips(&second.devices), vec![GATEWAY, NAS]);

    let mut registry = ips(&harness.coordinator.devices());
    registry.sort();
    assert_eq!(registry, vec![GATEWAY, NAS]);
    assert_eq!(harness.observer.count(|e| *e == Event::Started), 2);
}

#[tokio::test]
async fn pool_width_does_not_change_the_result() {
    let replies = [
        (GATEWAY, Duration::from_millis(1)),
        (PRINTER, Duration::from_millis(5)),
        (NAS, Duration::from_millis(9)),
    ];
    let names = [(GATEWAY, "router.lan"), (NAS, "nas.lan")];

    let sequential = Harness::new(
        config(1),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&replies),
        MapResolver::new(&names),
    );
    let parallel = Harness::new(
        config(64),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&replies),
        MapResolver::new(&names),
    );

    let a = sequential.coordinator.start_scan().await.unwrap();
    let b = parallel.coordinator.start_scan().await.unwrap();

    assert_eq!(a.devices, b.devices);
}

#[tokio::test]
async fn sequential_sweep_follows_enumeration_order() {
    let harness = Harness::new(
        config(1),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&[
            (NAS, Duration::from_millis(1)),
            (GATEWAY, Duration::from_millis(1)),
        ]),
        MapResolver::default(),
    );

    harness.coordinator.start_scan().await.unwrap();

    let expected: Vec<Ipv4Addr> = SubnetRange::around(LOCAL).iter().collect();
    assert_eq!(harness.pinger.probed(), expected);
    assert_eq!(ips(&harness.coordinator.devices()), vec![GATEWAY, NAS]);

    let progress = harness.observer.progress();
    assert_eq!(progress.len(), 254);
    assert!(progress.windows(2).all(|w| w[0].0 + 1 == w[1].0));
}

/*************************************************************
                    Configuration failures
**************************************************************/

#[tokio::test]
async fn missing_local_address_aborts_before_probing() {
    let harness = Harness::new(
        config(32),
        None,
        ScriptedPinger::new(&[(GATEWAY, Duration::from_millis(1))]),
        MapResolver::default(),
    );

    let err = harness.coordinator.start_scan().await.unwrap_err();

    assert!(matches!(err, ScanError::NoLocalAddress));
    assert!(err.is_configuration_failure());
    assert!(harness.pinger.probed().is_empty());
    assert_eq!(harness.observer.count(|e| matches!(e, Event::Fatal(_))), 1);
    assert_eq!(harness.observer.count(|e| *e == Event::Finished), 0);
    assert!(harness.observer.progress().is_empty());
    assert!(!harness.coordinator.is_scanning());
}

#[tokio::test]
async fn fatal_error_carries_a_readable_message() {
    let harness = Harness::new(config(32), None, ScriptedPinger::new(&[]), MapResolver::default());

    harness.coordinator.start_scan().await.unwrap_err();

    let Some(Event::Fatal(message)) = harness.observer.events().pop() else {
        panic!("expected a fatal error notification");
    };
    assert!(message.contains("no active interface"), "message: {message}");
}

#[tokio::test]
async fn requested_interface_must_exist() {
    let cfg = Config {
        interface: Some("eth9".to_string()),
        ..config(32)
    };
    let harness = Harness::new(cfg, Some(wlan0(LOCAL)), ScriptedPinger::new(&[]), MapResolver::default());

    let err = harness.coordinator.start_scan().await.unwrap_err();

    assert!(matches!(err, ScanError::InterfaceNotFound(ref name) if name == "eth9"));
    assert!(harness.pinger.probed().is_empty());
}

#[tokio::test]
async fn coordinator_recovers_after_fatal_error() {
    let harness = Harness::new(config(32), None, ScriptedPinger::new(&[]), MapResolver::default());

    harness.coordinator.start_scan().await.unwrap_err();
    harness.observer.clear();
    let err = harness.coordinator.start_scan().await.unwrap_err();

    assert!(matches!(err, ScanError::NoLocalAddress));
    assert_eq!(
        harness.observer.events(),
        vec![
            Event::Started,
            Event::Fatal(ScanError::NoLocalAddress.to_string())
        ]
    );
}

/*************************************************************
                    Lifecycle control
**************************************************************/

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_cancels_a_running_sweep() {
    let harness = Harness::new(
        config(1),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&[(GATEWAY, Duration::from_millis(1))])
            .with_delay(Duration::from_millis(10)),
        MapResolver::default(),
    );

    let scan = tokio::spawn({
        let coordinator = harness.coordinator.clone();
        async move { coordinator.start_scan().await }
    });

    wait_for_probes(&harness, 3).await;
    assert!(harness.coordinator.is_scanning());
    assert!(harness.coordinator.stop());

    let report = scan.await.unwrap().unwrap();

    assert!(report.cancelled);
    assert!(report.probed < 254);
    assert_eq!(ips(&report.devices), vec![GATEWAY]);
    assert!(!harness.coordinator.is_scanning());
    assert_eq!(harness.observer.events().last(), Some(&Event::Finished));
}

#[tokio::test]
async fn stop_without_a_scan_is_a_no_op() {
    let harness = Harness::new(config(32), Some(wlan0(LOCAL)), ScriptedPinger::new(&[]), MapResolver::default());

    assert!(!harness.coordinator.stop());
    let report = harness.coordinator.start_scan().await.unwrap();
    assert!(!report.cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_scan_request_is_rejected_while_scanning() {
    let harness = Harness::new(
        config(4),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&[]).with_delay(Duration::from_millis(5)),
        MapResolver::default(),
    );

    let scan = tokio::spawn({
        let coordinator = harness.coordinator.clone();
        async move { coordinator.start_scan().await }
    });

    wait_for_probes(&harness, 1).await;
    let err = harness.coordinator.start_scan().await.unwrap_err();
    assert!(matches!(err, ScanError::AlreadyScanning));

    // the running scan is unaffected
    let report = scan.await.unwrap().unwrap();
    assert_eq!(report.probed, 254);
    assert_eq!(harness.observer.count(|e| *e == Event::Started), 1);

    harness.pinger.clear_probed();
    harness.coordinator.start_scan().await.unwrap();
    assert_eq!(harness.pinger.probed().len(), 254);
}

#[tokio::test]
async fn coordinator_is_idle_when_scan_finished_is_delivered() {
    let (coordinator, observer) = observed_by_state(
        config(32),
        Some(wlan0(LOCAL)),
        ScriptedPinger::new(&[(GATEWAY, Duration::from_millis(1))]),
    );

    coordinator.start_scan().await.unwrap();

    assert_eq!(observer.seen(), vec![("started", true), ("finished", false)]);
}

#[tokio::test]
async fn coordinator_is_idle_when_fatal_error_is_delivered() {
    let (coordinator, observer) = observed_by_state(config(32), None, ScriptedPinger::new(&[]));

    coordinator.start_scan().await.unwrap_err();

    assert_eq!(observer.seen(), vec![("started", true), ("fatal", false)]);
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    use netsweep_core::DiscoveryCoordinator;
    use std::sync::Arc;

    use super::fakes::{RecordingObserver, StaticAddress};

    let cfg = Config {
        concurrency: 0,
        ..Config::default()
    };
    let result = DiscoveryCoordinator::new(
        cfg,
        Box::new(StaticAddress(None)),
        Arc::new(ScriptedPinger::new(&[])),
        None,
        Arc::new(RecordingObserver::default()),
    );

    assert!(matches!(result, Err(ScanError::InvalidConfig(_))));
}
