use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use colored::*;
use is_root::is_root;
use netsweep_common::ScanError;
use netsweep_common::config::Config;
use netsweep_common::network::device::DeviceInfo;
use netsweep_core::discovery::{DiscoveryCoordinator, ScanReport};
use netsweep_core::ports::ScanObserver;
use tracing::{debug, warn};

use crate::mprint;
use crate::terminal::{colors, format, print, spinner};

/// Conventional status for a process ended by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Renders engine notifications on the terminal while the sweep runs.
struct TerminalObserver {
    found: AtomicUsize,
    quiet: u8,
}

impl TerminalObserver {
    fn new(quiet: u8) -> Self {
        Self {
            found: AtomicUsize::new(0),
            quiet,
        }
    }
}

impl ScanObserver for TerminalObserver {
    fn on_scan_started(&self) {
        self.found.store(0, Ordering::Relaxed);
        spinner::start_sweep();
    }

    fn on_device_found(&self, device: &DeviceInfo) {
        let count: usize = self.found.fetch_add(1, Ordering::Relaxed) + 1;
        if self.quiet == 0 {
            print::print_status(format::device_line(device));
        }
        spinner::report_discovery_progress(count);
    }

    fn on_probe_complete(&self, done: usize, total: usize) {
        spinner::report_probe_progress(done, total);
    }

    fn on_scan_finished(&self) {
        spinner::finish();
    }

    fn on_fatal_error(&self, message: &str) {
        spinner::finish();
        print::header("scan aborted", 0);
        print::print_status(message.red().bold().to_string());
    }
}

pub async fn discover(cfg: &Config) -> anyhow::Result<ExitCode> {
    if !is_root() {
        warn!("Not running as root: opening the ICMP socket will likely fail");
    }

    let observer = Arc::new(TerminalObserver::new(cfg.quiet));
    let coordinator = match DiscoveryCoordinator::with_system_adapters(cfg.clone(), observer) {
        Ok(coordinator) => Arc::new(coordinator),
        Err(e @ ScanError::Socket(_)) => {
            return Err(anyhow::Error::new(e).context("cannot send echo requests"));
        }
        Err(e) => return Err(e.into()),
    };

    let ctrl_c = tokio::spawn(stop_on_ctrl_c(Arc::clone(&coordinator)));

    let result = coordinator.start_scan().await;
    ctrl_c.abort();

    match result {
        Ok(report) => {
            discovery_ends(&report, cfg.quiet);
            Ok(ExitCode::SUCCESS)
        }
        // Already shown by the observer.
        Err(e) if e.is_configuration_failure() => Ok(ExitCode::FAILURE),
        Err(e) => Err(e.into()),
    }
}

/// What a Ctrl-C means at the moment it arrives.
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// A scan was running and has been told to stop.
    Stopping,
    /// Nothing to stop: the scan has not started or already returned.
    Quit,
}

fn handle_interrupt(coordinator: &DiscoveryCoordinator) -> Interrupt {
    if coordinator.stop() {
        Interrupt::Stopping
    } else {
        Interrupt::Quit
    }
}

/// Keeps listening for Ctrl-C for the whole run, since installing the handler
/// replaces the default SIGINT behaviour.
async fn stop_on_ctrl_c(coordinator: Arc<DiscoveryCoordinator>) {
    while tokio::signal::ctrl_c().await.is_ok() {
        match handle_interrupt(&coordinator) {
            Interrupt::Stopping => debug!("Ctrl-C received, stopping scan"),
            Interrupt::Quit => {
                spinner::finish();
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        }
    }
}

fn discovery_ends(report: &ScanReport, quiet: u8) {
    if report.devices.is_empty() {
        no_hosts_found(report, quiet);
        return;
    }

    if quiet > 0 {
        mprint!();
    }

    print::header("Network Discovery", quiet);
    print_hosts(&report.devices, quiet);
    print_summary(report, quiet);
}

fn no_hosts_found(report: &ScanReport, quiet: u8) {
    print::header("ZERO HOSTS DETECTED", quiet);
    print::no_results();
    if report.cancelled {
        print::print_status(stopped_note(report));
    }
}

fn print_hosts(devices: &[DeviceInfo], quiet: u8) {
    if quiet == 2 {
        return;
    }
    for (idx, device) in devices.iter().enumerate() {
        print::tree_head(idx, device.hostname());
        print::as_tree_one_level(format::device_to_details(device));
        if idx + 1 != devices.len() {
            mprint!();
        }
    }
}

fn print_summary(report: &ScanReport, quiet: u8) {
    let active_hosts: ColoredString = format!("{} active hosts", report.devices.len())
        .bold()
        .green();
    let total_time: ColoredString = seconds(report.elapsed).bold().yellow();
    let output: String = format!(
        "{}",
        format!("Discovery Complete: {active_hosts} identified in {total_time}")
            .color(colors::TEXT_DEFAULT)
    );

    match quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output);
        }
        _ => {
            mprint!();
            print::print_status(&output);
        }
    }

    if report.cancelled {
        print::print_status(stopped_note(report));
    }
}

fn stopped_note(report: &ScanReport) -> String {
    format!(
        "Stopped early: {} of {} addresses probed",
        report.probed,
        report.subnet.len()
    )
    .yellow()
    .to_string()
}

fn seconds(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}
