//! Linux neighbor table from `/proc/net/arp`.
//!
//! ```text
//! IP address       HW type     Flags       HW address            Mask     Device
//! 192.168.1.1      0x1         0x2         18:0f:76:00:00:01     *        eth0
//! ```

#![cfg_attr(not(target_os = "linux"), allow(dead_code))]

use pnet::util::MacAddr;
use std::net::IpAddr;

#[cfg(target_os = "linux")]
pub const PROC_NET_ARP: &str = "/proc/net/arp";

/// Read and parse the kernel ARP cache.
#[cfg(target_os = "linux")]
pub fn read_table() -> std::io::Result<Vec<(IpAddr, MacAddr)>> {
    let content = std::fs::read_to_string(PROC_NET_ARP)?;
    Ok(parse_table(&content))
}

/// Parse `/proc/net/arp` content. Incomplete entries (flags `0x0`) and
/// malformed lines are skipped.
pub fn parse_table(content: &str) -> Vec<(IpAddr, MacAddr)> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || fields[2] == "0x0" {
                return None;
            }
            let addr: IpAddr = fields[0].parse().ok()?;
            let mac: MacAddr = fields[3].parse().ok()?;
            Some((addr, mac))
        })
        .collect()
}
