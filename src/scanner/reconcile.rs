//! Merging probe results with the neighbor table, and final ordering.

use crate::neighbor::NeighborTable;
use crate::types::{AddressRange, HostInfo};
use tracing::debug;

/// Merge a neighbor table snapshot into the scanned hosts.
///
/// Scanned hosts with a neighbor entry take the cached MAC and the entry
/// is marked processed. Every remaining entry inside the range's host
/// bounds becomes a new host in the `Unknown` state. Returns the number
/// of hosts added.
pub fn reconcile(hosts: &mut Vec<HostInfo>, table: &mut NeighborTable, range: &AddressRange) -> usize {
    for host in hosts.iter_mut() {
        let Some(mac) = table.mark_processed(&host.address) else {
            continue;
        };
        if let Some(previous) = host.mac.replace(mac) {
            if previous != mac {
                host.add_comment(format!("additional MAC address: {previous}"));
            }
        }
    }

    let passive: Vec<HostInfo> = table
        .unprocessed()
        .filter(|(addr, _)| range.contains(*addr))
        .map(|(addr, mac)| HostInfo::passive(addr, mac))
        .collect();

    let added = passive.len();
    debug!(added, "hosts found only in the neighbor table");
    hosts.extend(passive);
    added
}

/// Stable sort by address; IPv4 orders before IPv6.
pub fn sort_hosts(hosts: &mut [HostInfo]) {
    hosts.sort_by(|a, b| a.address.cmp(&b.address));
}
