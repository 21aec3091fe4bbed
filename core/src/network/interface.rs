use netsweep_common::network::interface::{self, LocalAddress};
use pnet::datalink::{self, NetworkInterface};
use tracing::debug;

use crate::ports::LocalAddressSource;

/// The host's live interface table, as reported by the OS.
pub struct SystemInterfaces;

impl LocalAddressSource for SystemInterfaces {
    fn local_address(&self, only: Option<&str>) -> Option<LocalAddress> {
        let interfaces: Vec<NetworkInterface> = datalink::interfaces();
        debug!("Identified {} network interface(s)", interfaces.len());
        interface::select_local_address(&interfaces, only)
    }
}
