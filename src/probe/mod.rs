//! Active probes and the registry that orders them.
//!
//! This module contains:
//! - [`Probe`] trait implemented by every technique
//! - TCP connect, ICMP echo and NetBIOS status probes
//! - [`ProbeRegistry`], the ordered set of probes enabled for one run

mod icmp;
mod nbstat;
mod tcp;
mod traits;

pub use icmp::IcmpEchoProbe;
pub use nbstat::{build_request, parse_status_response, NbstatProbe, NBNS_PORT};
pub use tcp::TcpConnectProbe;
pub use traits::{BoxedProbe, Probe, ProbeKind};

use crate::config::ScanSettings;
use crate::error::ScanError;

/// The enabled probes for one run, in a fixed order.
///
/// Probes sharing a host record run in this order, so comment order on
/// each host is reproducible.
pub struct ProbeRegistry {
    probes: Vec<BoxedProbe>,
}

impl ProbeRegistry {
    /// Build the registry from the run settings: TCP, then ICMP, then NBSTAT.
    pub fn from_settings(settings: &ScanSettings) -> Self {
        let mut probes: Vec<BoxedProbe> = Vec::new();
        if settings.probes.tcp {
            probes.push(Box::new(TcpConnectProbe::new(settings.tcp_ports.clone())));
        }
        if settings.probes.icmp {
            probes.push(Box::new(IcmpEchoProbe::new()));
        }
        if settings.probes.nbstat {
            probes.push(Box::new(NbstatProbe::new(settings.identity_policy)));
        }
        Self { probes }
    }

    /// Build a registry from an explicit list, kept in the given order.
    pub fn with_probes(probes: Vec<BoxedProbe>) -> Self {
        Self { probes }
    }

    pub fn step_count(&self) -> usize {
        self.probes.len()
    }

    /// The probe at position `index`.
    pub fn step_at(&self, index: usize) -> Result<&dyn Probe, ScanError> {
        self.probes
            .get(index)
            .map(|probe| probe.as_ref())
            .ok_or(ScanError::IndexOutOfRange {
                index,
                len: self.probes.len(),
            })
    }

    /// Iterate over the probes in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Probe> {
        self.probes.iter().map(|probe| probe.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|probe| probe.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeSelection;

    fn settings(probes: ProbeSelection) -> ScanSettings {
        ScanSettings {
            probes,
            ..ScanSettings::default()
        }
    }

    #[test]
    fn test_registry_order_is_fixed() {
        let registry = ProbeRegistry::from_settings(&settings(ProbeSelection {
            tcp: true,
            icmp: false,
            nbstat: true,
            neighbors: false,
        }));
        assert_eq!(registry.step_count(), 2);
        assert_eq!(registry.names(), vec!["TCP Scan", "NBSTAT Probe"]);
        assert_eq!(registry.step_at(1).unwrap().name(), "NBSTAT Probe");
    }

    #[test]
    fn test_step_at_out_of_range() {
        let registry = ProbeRegistry::with_probes(vec![Box::new(TcpConnectProbe::new(vec![80]))]);
        assert!(registry.step_at(0).is_ok());
        assert_eq!(
            registry.step_at(1).err(),
            Some(ScanError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProbeRegistry::from_settings(&settings(ProbeSelection {
            tcp: false,
            icmp: false,
            nbstat: false,
            neighbors: true,
        }));
        assert!(registry.is_empty());
        assert_eq!(registry.step_count(), 0);
    }
}
