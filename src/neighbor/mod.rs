//! Passive neighbor (ARP) table snapshots.
//!
//! The operating system already knows the link-layer address of every
//! host it talked to recently. After probing, that cache is read once and
//! merged into the results, which recovers hosts that answered no probe.
//!
//! Retrieval is platform specific:
//! - Linux: `/proc/net/arp` ([`procfs`])
//! - macOS: routing table dump through `sysctl` ([`route`])
//! - Windows: output of `arp -a` ([`arp_cmd`])
//!
//! Every retriever is fallible; a failure is logged and yields an empty
//! table.

pub mod arp_cmd;
pub mod procfs;
pub mod route;

use pnet::util::MacAddr;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{debug, warn};

/// One cached neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NeighborEntry {
    mac: MacAddr,
    /// Set once the entry has been matched to an actively scanned host.
    processed: bool,
}

/// Snapshot of the neighbor cache, keyed by network address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborTable {
    entries: HashMap<IpAddr, NeighborEntry>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from address/MAC pairs, dropping unusable MACs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (IpAddr, MacAddr)>) -> Self {
        let mut table = Self::new();
        for (addr, mac) in pairs {
            table.insert(addr, mac);
        }
        table
    }

    /// Add an entry. Broadcast, multicast and all-zero MACs are rejected.
    pub fn insert(&mut self, addr: IpAddr, mac: MacAddr) -> bool {
        if !is_usable_mac(mac) {
            return false;
        }
        self.entries.insert(
            addr,
            NeighborEntry {
                mac,
                processed: false,
            },
        );
        true
    }

    /// Mark the entry for `addr` as matched and return its MAC.
    pub fn mark_processed(&mut self, addr: &IpAddr) -> Option<MacAddr> {
        self.entries.get_mut(addr).map(|entry| {
            entry.processed = true;
            entry.mac
        })
    }

    /// Entries not yet matched to a scanned host.
    pub fn unprocessed(&self) -> impl Iterator<Item = (IpAddr, MacAddr)> + '_ {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.processed)
            .map(|(addr, entry)| (*addr, entry.mac))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unicast and not all zero. Broadcast is a special case of multicast.
fn is_usable_mac(mac: MacAddr) -> bool {
    mac.0 & 0x01 == 0 && mac != MacAddr::zero()
}

/// Anything that can produce a neighbor table snapshot.
pub trait NeighborSource: Send + Sync {
    fn snapshot(&self) -> NeighborTable;
}

impl NeighborSource for NeighborTable {
    fn snapshot(&self) -> NeighborTable {
        self.clone()
    }
}

/// The running system's neighbor cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNeighbors;

impl NeighborSource for SystemNeighbors {
    fn snapshot(&self) -> NeighborTable {
        match retrieve() {
            Ok(pairs) => {
                let table = NeighborTable::from_pairs(pairs);
                debug!(entries = table.len(), "read neighbor table");
                table
            }
            Err(e) => {
                warn!(error = %e, "could not read neighbor table");
                NeighborTable::new()
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn retrieve() -> std::io::Result<Vec<(IpAddr, MacAddr)>> {
    procfs::read_table()
}

#[cfg(target_os = "macos")]
fn retrieve() -> std::io::Result<Vec<(IpAddr, MacAddr)>> {
    route::read_table()
}

#[cfg(windows)]
fn retrieve() -> std::io::Result<Vec<(IpAddr, MacAddr)>> {
    arp_cmd::read_table()
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
fn retrieve() -> std::io::Result<Vec<(IpAddr, MacAddr)>> {
    debug!("neighbor table retrieval not supported on this platform");
    Ok(Vec::new())
}
