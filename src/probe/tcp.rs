//! TCP connect probe.
//!
//! Connects to a small set of well-known ports at once. An accepted
//! connection proves liveness, and so does a refusal: a RST means a live
//! stack answered even though nothing listens. Timeouts and unreachable
//! errors give no signal either way.

use crate::error::{ProbeError, ProbeResult};
use crate::probe::traits::{Probe, ProbeKind};
use crate::services::get_service_description;
use crate::types::{HostInfo, HostState};
use async_trait::async_trait;
use futures::future::join_all;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Outcome of one connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortOutcome {
    Open,
    Refused,
    NoSignal,
    Cancelled,
}

/// TCP connect probe.
///
/// Does not require elevated privileges.
pub struct TcpConnectProbe {
    ports: Vec<u16>,
}

impl TcpConnectProbe {
    pub fn new(ports: Vec<u16>) -> Self {
        Self { ports }
    }

    async fn attempt_connect(
        cancel: &CancellationToken,
        target: IpAddr,
        port: u16,
        timeout: Duration,
    ) -> PortOutcome {
        let addr = SocketAddr::new(target, port);
        let attempt = tokio::time::timeout(timeout, TcpStream::connect(addr));

        tokio::select! {
            _ = cancel.cancelled() => PortOutcome::Cancelled,
            result = attempt => match result {
                Ok(Ok(_stream)) => PortOutcome::Open,
                Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => PortOutcome::Refused,
                Ok(Err(e)) => {
                    trace!(%addr, error = %e, "connect failed");
                    PortOutcome::NoSignal
                }
                Err(_) => {
                    trace!(%addr, "connect timed out");
                    PortOutcome::NoSignal
                }
            },
        }
    }
}

#[async_trait]
impl Probe for TcpConnectProbe {
    fn name(&self) -> &'static str {
        ProbeKind::Tcp.name()
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

        let target = host.address;
        let outcomes = join_all(
            self.ports
                .iter()
                .map(|&port| Self::attempt_connect(cancel, target, port, timeout)),
        )
        .await;

        let open: Vec<u16> = self
            .ports
            .iter()
            .zip(&outcomes)
            .filter(|(_, outcome)| **outcome == PortOutcome::Open)
            .map(|(&port, _)| port)
            .collect();
        let refused = outcomes.contains(&PortOutcome::Refused);

        if !open.is_empty() {
            let listing = open
                .iter()
                .map(|&port| format!("{} ({})", port, get_service_description(port)))
                .collect::<Vec<_>>()
                .join(", ");
            host.raise_state(HostState::Alive);
            host.add_comment(format!("open TCP ports: {listing}"));
        } else if refused {
            host.raise_state(HostState::Alive);
            host.add_comment("TCP connection refused (host reachable)");
        }

        if outcomes.contains(&PortOutcome::Cancelled) {
            return Err(ProbeError::Cancelled);
        }
        Ok(())
    }
}
