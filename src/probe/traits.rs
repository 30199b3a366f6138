//! Probe trait abstraction.
//!
//! Every active discovery technique implements [`Probe`]. The orchestrator
//! only sees the trait object and runs each enabled probe in turn against
//! one shared [`HostInfo`].

use crate::error::ProbeResult;
use crate::types::HostInfo;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Available active probe kinds, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// TCP connect to a handful of well-known ports.
    Tcp,
    /// ICMP echo request.
    Icmp,
    /// NetBIOS node status query.
    Nbstat,
}

impl ProbeKind {
    /// Display name, also used to prefix probe comments.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP Scan",
            Self::Icmp => "ICMP Ping",
            Self::Nbstat => "NBSTAT Probe",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One active technique for testing host liveness and identity.
///
/// `run` writes its findings into `host` rather than returning them, so
/// several probes can accumulate independent signals on the same record.
/// It may only raise the host state, set identity fields and append
/// comments. Getting no answer is not an error; `run` fails only when a
/// reply could not be interpreted or the scan was cancelled.
///
/// Implementations must check `cancel` before starting any I/O and stop
/// waiting as soon as it fires.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Human-readable probe name.
    fn name(&self) -> &'static str;

    /// Probe one host, bounding every network wait by `timeout`.
    async fn run(
        &self,
        cancel: &CancellationToken,
        host: &mut HostInfo,
        timeout: Duration,
    ) -> ProbeResult<()>;
}

/// A boxed probe for dynamic dispatch.
pub type BoxedProbe = Box<dyn Probe>;
