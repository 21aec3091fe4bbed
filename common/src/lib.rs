//! # netsweep common
//!
//! Types shared by every layer of the sweep: the device model, the subnet
//! arithmetic, interface selection, configuration and the error taxonomy.
//!
//! Nothing in here performs I/O. Reading the OS interface table, sending
//! probes and talking to a nameserver all live in `netsweep-core`.

pub mod config;
pub mod error;
pub mod network;
pub mod utils;

pub use error::ScanError;
