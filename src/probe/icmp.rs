//! ICMP echo probe.
//!
//! Uses `surge-ping`, which needs either a raw socket (root) or an
//! unprivileged ping socket permitted by the kernel. When neither is
//! available the probe still runs but produces no signal.

use crate::error::{ProbeError, ProbeResult};
use crate::probe::traits::{Probe, ProbeKind};
use crate::types::{HostInfo, HostState};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use surge_ping::{Client, Config, PingIdentifier, PingSequence, ICMP};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

const PAYLOAD: [u8; 32] = [0u8; 32];

/// ICMP echo probe with one client per address family.
pub struct IcmpEchoProbe {
    v4: Option<Client>,
    v6: Option<Client>,
}

impl IcmpEchoProbe {
    /// Open the ICMP sockets. Failures are logged and leave that family
    /// without a client.
    pub fn new() -> Self {
        let v4 = match Client::new(&Config::default()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "ICMPv4 socket unavailable, ping probe disabled for IPv4");
                None
            }
        };
        let v6 = match Client::new(&Config::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "ICMPv6 socket unavailable, ping probe disabled for IPv6");
                None
            }
        };
        Self { v4, v6 }
    }

    fn client_for(&self, addr: IpAddr) -> Option<&Client> {
        match addr {
            IpAddr::V4(_) => self.v4.as_ref(),
            IpAddr::V6(_) => self.v6.as_ref(),
        }
    }
}

impl Default for IcmpEchoProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for IcmpEchoProbe {
    fn name(&self) -> &'static str {
        ProbeKind::Icmp.name()
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        host: &mut HostInfo,
        timeout: Duration,
    ) -> ProbeResult<()> {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        let Some(client) = self.client_for(host.address) else {
            return Err(ProbeError::Unsupported("no ICMP socket for this address family"));
        };

        let mut pinger = client
            .pinger(host.address, PingIdentifier(rand::random()))
            .await;
        pinger.timeout(timeout);

        tokio::select! {
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            reply = pinger.ping(PingSequence(0), &PAYLOAD) => {
                match reply {
                    Ok((_packet, rtt)) => {
                        host.raise_state(HostState::Alive);
                        host.add_comment(format!("ICMP echo reply in {rtt:.2?}"));
                    }
                    Err(e) => trace!(address = %host.address, error = %e, "no echo reply"),
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_probe_name() {
        let probe = IcmpEchoProbe::new();
        assert_eq!(probe.name(), "ICMP Ping");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let probe = IcmpEchoProbe::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut host = HostInfo::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));

        let result = probe.run(&cancel, &mut host, Duration::from_millis(10)).await;

        assert!(matches!(result, Err(ProbeError::Cancelled)));
        assert!(host.is_dead());
    }

    #[tokio::test]
    async fn test_missing_client_is_unsupported() {
        let probe = IcmpEchoProbe { v4: None, v6: None };
        let mut host = HostInfo::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));

        let result = probe
            .run(&CancellationToken::new(), &mut host, Duration::from_millis(10))
            .await;

        assert!(matches!(result, Err(ProbeError::Unsupported(_))));

        assert!(host.is_dead());
        assert!(host.comments.is_empty());
    }
}
