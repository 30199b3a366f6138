//! Configuration management for netscan.
//!
//! [`AppSettings`] holds persistent defaults from the XDG config
//! directory; [`ScanSettings`] is the per-run configuration built from
//! them and the command line.

mod scan;
mod settings;

pub use scan::{ProbeSelection, ScanSettings};
pub use settings::{AppSettings, Paths, MAX_THREADS};
