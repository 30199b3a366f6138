//! Names for the well-known TCP ports the connect probe reports.
//!
//! Only used to label open ports in host comments; no fingerprinting is
//! done.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Ports commonly found open on hosts in a local segment.
const KNOWN_PORTS: &[(u16, &str)] = &[
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (53, "dns"),
    (80, "http"),
    (88, "kerberos"),
    (110, "pop3"),
    (111, "rpcbind"),
    (135, "msrpc"),
    (139, "netbios-ssn"),
    (143, "imap"),
    (389, "ldap"),
    (443, "https"),
    (445, "microsoft-ds"),
    (515, "printer"),
    (548, "afp"),
    (554, "rtsp"),
    (631, "ipp"),
    (873, "rsync"),
    (993, "imaps"),
    (1883, "mqtt"),
    (2049, "nfs"),
    (3306, "mysql"),
    (3389, "rdp"),
    (5000, "upnp"),
    (5353, "mdns"),
    (5432, "postgresql"),
    (5900, "vnc"),
    (6379, "redis"),
    (8000, "http-alt"),
    (8080, "http-proxy"),
    (8443, "https-alt"),
    (9100, "jetdirect"),
];

static PORT_SERVICES: LazyLock<HashMap<u16, &'static str>> =
    LazyLock::new(|| KNOWN_PORTS.iter().copied().collect());

/// Look up the probable service name for a given port.
///
/// Returns `None` if the port is not in the table.
pub fn get_service_name(port: u16) -> Option<&'static str> {
    PORT_SERVICES.get(&port).copied()
}

/// Get a descriptive string for the service on a port, "unknown" if the
/// port is not recognized.
pub fn get_service_description(port: u16) -> &'static str {
    get_service_name(port).unwrap_or("unknown")
}
