//! Error types for netscan.
//!
//! Uses `thiserror` for ergonomic error definitions.

use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning user input into an [`AddressRange`].
///
/// All of these are fatal and reported before any network activity.
///
/// [`AddressRange`]: crate::types::AddressRange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid address or CIDR notation: {0}")]
    AddressSyntax(String),

    #[error("range too large: {host_bits} host bits (max: {max_hosts} addresses)")]
    RangeTooLarge { host_bits: u32, max_hosts: u32 },

    #[error("{0} is not a private network address")]
    NotPrivateNetwork(IpAddr),
}

/// Errors a single probe call may return.
///
/// The orchestrator recovers from every one of these locally; none of them
/// aborts sibling probes or sibling hosts.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("scan cancelled")]
    Cancelled,

    #[error("not supported: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the scan machinery itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("probe step {index} out of range (registry holds {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors related to configuration management.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read config file {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid config format: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    InvalidValue(String),
}

/// Top-level errors surfaced by the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Error parsing CIDR/address: {0}")]
    Range(#[from] RangeError),

    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Error writing output: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type alias for range resolution.
pub type RangeResult<T> = Result<T, RangeError>;

/// Result type alias for probe calls.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
