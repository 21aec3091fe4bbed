use thiserror::Error;

/// Failures that cross the boundary between the discovery engine and its caller.
///
/// Per-address unreachability and reverse-lookup failures are *not* errors;
/// they are absorbed by the prober and never show up here.
#[derive(Debug, Error)]
pub enum ScanError {
    /// No interface is up with a usable IPv4 address.
    #[error("unable to determine the local IPv4 address: no active interface found")]
    NoLocalAddress,

    /// The interface requested in the configuration is missing, down, or has no IPv4 address.
    #[error("interface '{0}' is not up or has no IPv4 address")]
    InterfaceNotFound(String),

    /// A scan request arrived while another scan was still running.
    #[error("a scan is already in progress")]
    AlreadyScanning,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The probe socket could not be opened (usually missing privileges).
    #[error("failed to open probe socket: {0}")]
    Socket(#[from] std::io::Error),
}

impl ScanError {
    /// Whether this error means the local network configuration could not be read.
    pub fn is_configuration_failure(&self) -> bool {
        matches!(self, Self::NoLocalAddress | Self::InterfaceNotFound(_))
    }
}
