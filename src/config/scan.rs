//! The immutable configuration of one scan run.

use crate::config::{AppSettings, MAX_THREADS};
use crate::types::{AddressPolicy, IdentityPolicy};
use std::time::Duration;

/// Which discovery techniques are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSelection {
    pub tcp: bool,
    pub icmp: bool,
    pub nbstat: bool,
    /// Consult the system neighbor (ARP) table after probing.
    pub neighbors: bool,
}

impl ProbeSelection {
    /// Selection from command-line switches. With nothing selected, TCP
    /// connect and the neighbor table are used.
    pub fn from_flags(tcp: bool, icmp: bool, nbstat: bool, neighbors: bool) -> Self {
        if !(tcp || icmp || nbstat || neighbors) {
            return Self {
                tcp: true,
                neighbors: true,
                ..Self::default()
            };
        }
        Self {
            tcp,
            icmp,
            nbstat,
            neighbors,
        }
    }

    pub fn any_active(&self) -> bool {
        self.tcp || self.icmp || self.nbstat
    }
}

/// Everything a run needs, built once and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub probes: ProbeSelection,
    pub threads: usize,
    pub probe_timeout: Duration,
    pub tcp_ports: Vec<u16>,
    pub identity_policy: IdentityPolicy,
    pub address_policy: AddressPolicy,
    pub settle_delay: Duration,
}

impl ScanSettings {
    /// Start from the persistent settings.
    pub fn from_app(app: &AppSettings, probes: ProbeSelection) -> Self {
        Self {
            probes,
            threads: app.threads.clamp(1, MAX_THREADS),
            probe_timeout: Duration::from_millis(app.probe_timeout_ms),
            tcp_ports: app.tcp_ports.clone(),
            identity_policy: app.identity_policy,
            address_policy: AddressPolicy {
                allow_link_local: app.allow_link_local,
            },
            settle_delay: Duration::from_millis(app.settle_delay_ms),
        }
    }

    /// Override the worker count, kept within `1..=MAX_THREADS`.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.clamp(1, MAX_THREADS);
        self
    }

    /// Override the per-probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Override the grace period after the worker pool finishes.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        let probes = ProbeSelection::from_flags(false, false, false, false);
        Self::from_app(&AppSettings::default(), probes)
    }
}
