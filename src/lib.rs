//! # netscan - Local Network Host Discovery
//!
//! netscan finds live hosts in a private address range. It runs a chain of
//! active probes against every address concurrently, then merges the
//! results with the operating system's neighbor (ARP) cache.
//!
//! ## Features
//!
//! - **Range Resolution**: CIDR blocks or single addresses, IPv4 and IPv6,
//!   restricted to private networks of at most 65 536 addresses
//! - **Probes**: TCP connect, ICMP echo and NetBIOS node status
//! - **Bounded Concurrency**: configurable worker count with cooperative
//!   cancellation on Ctrl-C
//! - **Passive Discovery**: hosts known only to the neighbor table are
//!   reported as `unknown`
//! - **Multiple Output Formats**: Plain text, JSON, and CSV
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use netscan::config::ScanSettings;
//! use netscan::probe::ProbeRegistry;
//! use netscan::scanner::ScanOrchestrator;
//! use netscan::types::AddressRange;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let range: AddressRange = "192.168.1.0/24".parse().unwrap();
//!     let settings = ScanSettings::default();
//!     let scan = ScanOrchestrator::new(ProbeRegistry::from_settings(&settings), &settings);
//!
//!     let report = scan.run(&range, None, &CancellationToken::new(), None).await;
//!     for host in &report.hosts {
//!         println!("{} is {}", host.address, host.state());
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Address ranges, host records and the liveness lattice
//! - [`probe`] - The `Probe` trait, concrete probes and the registry
//! - [`scanner`] - The concurrent orchestrator and result reconciliation
//! - [`neighbor`] - Platform-specific neighbor table snapshots
//! - [`config`] - Persistent settings and per-run configuration
//! - [`error`] - Error types
//! - [`output`] - Output formatting utilities

pub mod cli;
pub mod config;
pub mod error;
pub mod neighbor;
pub mod output;
pub mod probe;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ProbeError, RangeError, ScanError};
pub use probe::{Probe, ProbeRegistry};
pub use scanner::{ScanOrchestrator, ScanReport};
pub use types::{AddressRange, HostInfo, HostState};
