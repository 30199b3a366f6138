//! Windows neighbor table from `arp -a`.
//!
//! The "Type" column is localized, so only the address and MAC columns are
//! used:
//!
//! ```text
//! Interface: 192.168.0.50 --- 0x11
//!   Internet Address      Physical Address      Type
//!   192.168.0.10          18-0f-76-00-00-00     dynamic
//!   192.168.0.255         ff-ff-ff-ff-ff-ff     static
//! ```

#![cfg_attr(not(windows), allow(dead_code))]

use pnet::util::MacAddr;
use std::net::IpAddr;

/// Run `arp -a` and parse its output.
#[cfg(windows)]
pub fn read_table() -> std::io::Result<Vec<(IpAddr, MacAddr)>> {
    let output = std::process::Command::new("arp").arg("-a").output()?;
    if !output.status.success() {
        return Err(std::io::Error::other(format!("arp -a exited with {}", output.status)));
    }
    Ok(parse_output(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `arp -a` output. Lines that are not exactly three columns of
/// address, MAC and type are skipped.
pub fn parse_output(output: &str) -> Vec<(IpAddr, MacAddr)> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [addr, mac, _kind] = fields.as_slice() else {
                return None;
            };
            let addr: IpAddr = addr.parse().ok()?;
            let mac: MacAddr = mac.replace('-', ":").parse().ok()?;
            Some((addr, mac))
        })
        .collect()
}
