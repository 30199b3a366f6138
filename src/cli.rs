//! Command-line interface definitions for netscan.
//!
//! Uses `clap` derive macros for declarative argument parsing.

use crate::config::ProbeSelection;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Discover live hosts in a local network range.
#[derive(Parser, Debug)]
#[command(name = "netscan")]
#[command(version)]
#[command(about = "Local network host discovery", long_about = None)]
pub struct Cli {
    /// Target network in CIDR notation (192.168.1.0/24) or a single address
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Probe hosts with TCP connect on well-known ports
    #[arg(short = 'c', long)]
    pub tcp: bool,

    /// Probe hosts with ICMP echo (may need root)
    #[arg(short = 'p', long)]
    pub ping: bool,

    /// Query NetBIOS names (NBSTAT)
    #[arg(short = 'n', long)]
    pub nbstat: bool,

    /// Merge in the system neighbor (ARP) table
    #[arg(short = 'a', long)]
    pub arp: bool,

    /// Maximum number of hosts probed at once, up to 65536 [default: 128]
    #[arg(short = 't', long, value_parser = clap::value_parser!(u32).range(1..=65_536))]
    pub threads: Option<u32>,

    /// Per-probe timeout in milliseconds [default: 1000]
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH", env = "NETSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Probe selection from the flags; TCP and ARP when none are given.
    pub fn probe_selection(&self) -> ProbeSelection {
        ProbeSelection::from_flags(self.tcp, self.ping, self.nbstat, self.arp)
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}
