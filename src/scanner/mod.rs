//! Scan orchestration.
//!
//! [`ScanOrchestrator`] runs every enabled probe against every address of
//! an [`AddressRange`] with bounded concurrency:
//!
//! 1. **Dispatching**: one worker per address, admitted through a
//!    semaphore of `threads` permits.
//! 2. **Draining**: no more admissions; in-flight workers finish and
//!    emit their records to a single collector.
//! 3. **Reconciling**: the neighbor table snapshot is merged in.
//! 4. **Sorted**: hosts are ordered by address.
//!
//! Cancellation stops admission only. Workers already running see the
//! token in their probes and still emit whatever they collected.

pub mod reconcile;

pub use reconcile::{reconcile, sort_hosts};

use crate::config::{ScanSettings, MAX_THREADS};
use crate::error::ProbeError;
use crate::neighbor::NeighborSource;
use crate::probe::ProbeRegistry;
use crate::types::{AddressRange, HostInfo, HostState};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Extra time a probe gets past its own timeout before the worker gives up on it.
const PROBE_GRACE: Duration = Duration::from_millis(250);

/// Name reported for the passive neighbor table step.
pub const NEIGHBOR_TABLE_NAME: &str = "ARP Table";

/// Stages of one run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScanPhase {
    Idle,
    Dispatching,
    Draining,
    Reconciling,
    Sorted,
    Done,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Draining => write!(f, "draining"),
            Self::Reconciling => write!(f, "reconciling"),
            Self::Sorted => write!(f, "sorted"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Complete scan results.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: String,
    pub probes: Vec<String>,
    pub threads: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Addresses handed to a worker.
    pub dispatched: usize,
    /// Records the collector received; equals `dispatched` unless a worker
    /// panicked.
    pub emitted: usize,
    pub interrupted: bool,
    pub hosts: Vec<HostInfo>,
}

impl ScanReport {
    pub fn count(&self, state: HostState) -> usize {
        self.hosts.iter().filter(|h| h.state() == state).count()
    }
}

/// Bounded-concurrency scan pipeline.
pub struct ScanOrchestrator {
    registry: Arc<ProbeRegistry>,
    threads: usize,
    probe_timeout: Duration,
    settle_delay: Duration,
}

impl ScanOrchestrator {
    pub fn new(registry: ProbeRegistry, settings: &ScanSettings) -> Self {
        Self {
            registry: Arc::new(registry),
            threads: settings.threads.clamp(1, MAX_THREADS),
            probe_timeout: settings.probe_timeout,
            settle_delay: settings.settle_delay,
        }
    }

    /// Display names of every step this run performs.
    pub fn step_names(&self, with_neighbors: bool) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();
        if with_neighbors {
            names.push(NEIGHBOR_TABLE_NAME.to_string());
        }
        names
    }

    /// Scan `range`, then merge in `neighbors` if given.
    pub async fn run(
        &self,
        range: &AddressRange,
        neighbors: Option<&dyn NeighborSource>,
        cancel: &CancellationToken,
        progress: Option<&ProgressBar>,
    ) -> ScanReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut phase = ScanPhase::Idle;

        let results = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel::<HostInfo>(self.threads);
        let collector = tokio::spawn(collect(rx, Arc::clone(&results), progress.cloned()));

        let semaphore = Arc::new(Semaphore::new(self.threads));
        let mut workers = JoinSet::new();
        let mut dispatched = 0usize;
        let mut interrupted = false;

        advance(&mut phase, ScanPhase::Dispatching);
        for addr in range.hosts() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            dispatched += 1;
            let registry = Arc::clone(&self.registry);
            let cancel = cancel.clone();
            let tx = tx.clone();
            let timeout = self.probe_timeout;

            workers.spawn(async move {
                let host = probe_host(&registry, &cancel, addr, timeout).await;
                if tx.send(host).await.is_err() {
                    warn!(%addr, "result collector closed early");
                }
                drop(permit);
            });

            while let Some(joined) = workers.try_join_next() {
                if let Err(e) = joined {
                    warn!(error = %e, "scan worker failed");
                }
            }
        }
        drop(tx);

        if interrupted {
            info!(dispatched, "scan interrupted, waiting for running workers");
        }
        advance(&mut phase, ScanPhase::Draining);
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "scan worker failed");
            }
        }
        let emitted = match collector.await {
            Ok(emitted) => emitted,
            Err(e) => {
                warn!(error = %e, "result collector failed");
                0
            }
        };
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        advance(&mut phase, ScanPhase::Reconciling);
        let mut hosts = std::mem::take(&mut *results.lock().await);
        if let Some(source) = neighbors {
            let mut table = source.snapshot();
            reconcile(&mut hosts, &mut table, range);
        }

        advance(&mut phase, ScanPhase::Sorted);
        sort_hosts(&mut hosts);

        advance(&mut phase, ScanPhase::Done);
        let report = ScanReport {
            target: range.to_string(),
            probes: self.step_names(neighbors.is_some()),
            threads: self.threads,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            dispatched,
            emitted,
            interrupted: interrupted || cancel.is_cancelled(),
            hosts,
        };
        info!(
            dispatched = report.dispatched,
            found = report.hosts.len(),
            duration_ms = report.duration_ms,
            "scan finished"
        );
        report
    }
}

fn advance(phase: &mut ScanPhase, next: ScanPhase) {
    debug_assert!(next > *phase, "scan phase moved backwards");
    info!(from = %phase, to = %next, "scan phase");
    *phase = next;
}

/// Run every registered probe, in order, against one address.
async fn probe_host(
    registry: &ProbeRegistry,
    cancel: &CancellationToken,
    addr: IpAddr,
    timeout: Duration,
) -> HostInfo {
    let mut host = HostInfo::new(addr);
    debug!(%addr, "probing host");

    for probe in registry.iter() {
        if cancel.is_cancelled() {
            break;
        }
        let call = probe.run(cancel, &mut host, timeout);
        match tokio::time::timeout(timeout + PROBE_GRACE, call).await {
            Ok(Ok(())) => {}
            Ok(Err(ProbeError::Cancelled)) => break,
            Ok(Err(ProbeError::Protocol(msg))) => {
                host.add_comment(format!("{}: {}", probe.name(), msg));
            }
            Ok(Err(e)) => debug!(%addr, probe = probe.name(), error = %e, "probe failed"),
            Err(_) => trace!(%addr, probe = probe.name(), "probe overran its timeout"),
        }
    }

    host
}

/// Single consumer of worker output. Keeps every host that is not dead
/// and returns how many records arrived.
async fn collect(
    mut rx: mpsc::Receiver<HostInfo>,
    results: Arc<Mutex<Vec<HostInfo>>>,
    progress: Option<ProgressBar>,
) -> usize {
    let mut emitted = 0;
    while let Some(host) = rx.recv().await {
        emitted += 1;
        if let Some(pb) = &progress {
            pb.inc(1);
        }
        if host.is_dead() {
            continue;
        }
        if let Some(pb) = &progress {
            pb.set_message(format!("found {}", host.address));
        }
        results.lock().await.push(host);
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeResult;
    use crate::neighbor::NeighborTable;
    use crate::probe::{BoxedProbe, Probe};
    use async_trait::async_trait;
    use pnet::util::MacAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Marks every host whose last octet is odd as alive.
    struct OddAlive;

    #[async_trait]
    impl Probe for OddAlive {
        fn name(&self) -> &'static str {
            "odd"
        }

        async fn run(
            &self,
            _cancel: &CancellationToken,
            host: &mut HostInfo,
            _timeout: Duration,
        ) -> ProbeResult<()> {
            if let IpAddr::V4(v4) = host.address {
                if v4.octets()[3] % 2 == 1 {
                    host.raise_state(HostState::Alive);
                }
            }
            Ok(())
        }
    }

    /// Appends a comment, or fails with a protocol error.
    struct Commenting {
        text: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Probe for Commenting {
        fn name(&self) -> &'static str {
            "commenting"
        }

        async fn run(
            &self,
            _cancel: &CancellationToken,
            host: &mut HostInfo,
            _timeout: Duration,
        ) -> ProbeResult<()> {
            if self.fail {
                return Err(ProbeError::Protocol(self.text.to_string()));
            }
            host.add_comment(self.text);
            Ok(())
        }
    }

    /// Tracks how many calls run at the same time.
    struct Concurrency {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Probe for Arc<Concurrency> {
        fn name(&self) -> &'static str {
            "concurrency"
        }

        async fn run(
            &self,
            _cancel: &CancellationToken,
            _host: &mut HostInfo,
            _timeout: Duration,
        ) -> ProbeResult<()> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn settings(threads: usize) -> ScanSettings {
        ScanSettings::default()
            .with_threads(threads)
            .with_timeout(Duration::from_millis(200))
            .with_settle_delay(Duration::ZERO)
    }

    fn orchestrator(probes: Vec<BoxedProbe>, threads: usize) -> ScanOrchestrator {
        ScanOrchestrator::new(ProbeRegistry::with_probes(probes), &settings(threads))
    }

    #[tokio::test]
    async fn test_dead_hosts_are_filtered_and_sorted() {
        let range: AddressRange = "10.1.2.0/28".parse().unwrap();
        let scan = orchestrator(vec![Box::new(OddAlive)], 4);

        let report = scan.run(&range, None, &CancellationToken::new(), None).await;

        assert_eq!(report.dispatched, 14);
        assert_eq!(report.emitted, 14);
        assert!(!report.interrupted);
        let found: Vec<String> = report.hosts.iter().map(|h| h.address.to_string()).collect();
        let expected: Vec<String> = [1, 3, 5, 7, 9, 11, 13]
            .iter()
            .map(|i| format!("10.1.2.{i}"))
            .collect();
        assert_eq!(found, expected);
        assert_eq!(report.count(HostState::Alive), 7);
        assert_eq!(report.target, "10.1.2.0/28");
    }

    #[tokio::test]
    async fn test_probe_order_and_protocol_errors() {
        let range: AddressRange = "10.1.2.1".parse().unwrap();
        let scan = orchestrator(
            vec![
                Box::new(OddAlive),
                Box::new(Commenting {
                    text: "first",
                    fail: false,
                }),
                Box::new(Commenting {
                    text: "short header",
                    fail: true,
                }),
                Box::new(Commenting {
                    text: "last",
                    fail: false,
                }),
            ],
            1,
        );

        let report = scan.run(&range, None, &CancellationToken::new(), None).await;

        assert_eq!(report.hosts.len(), 1);
        assert_eq!(
            report.hosts[0].comments,
            vec!["first", "commenting: short header", "last"]
        );
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let tracker = Arc::new(Concurrency {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let range: AddressRange = "10.9.0.0/26".parse().unwrap();
        let scan = orchestrator(vec![Box::new(Arc::clone(&tracker))], 3);

        let report = scan.run(&range, None, &CancellationToken::new(), None).await;

        assert_eq!(report.dispatched, 62);
        assert!(tracker.peak.load(Ordering::SeqCst) <= 3);
        assert!(report.hosts.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_dispatches_nothing() {
        let range: AddressRange = "10.1.2.0/24".parse().unwrap();
        let scan = orchestrator(vec![Box::new(OddAlive)], 8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = scan.run(&range, None, &cancel, None).await;

        assert_eq!(report.dispatched, 0);
        assert_eq!(report.emitted, 0);
        assert!(report.interrupted);
        assert!(report.hosts.is_empty());
    }

    #[tokio::test]
    async fn test_neighbor_table_merged() {
        let range: AddressRange = "10.1.2.0/29".parse().unwrap();
        let mac = MacAddr::new(0x02, 0x11, 0x22, 0x33, 0x44, 0x55);
        let table = NeighborTable::from_pairs([
            ("10.1.2.3".parse().unwrap(), mac),
            ("10.1.2.4".parse().unwrap(), mac),
        ]);
        let scan = orchestrator(vec![Box::new(OddAlive)], 2);

        let report = scan
            .run(&range, Some(&table), &CancellationToken::new(), None)
            .await;

        assert_eq!(report.probes, vec!["odd", "ARP Table"]);
        let summary: Vec<(String, HostState, bool)> = report
            .hosts
            .iter()
            .map(|h| (h.address.to_string(), h.state(), h.mac.is_some()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("10.1.2.1".to_string(), HostState::Alive, false),
                ("10.1.2.3".to_string(), HostState::Alive, true),
                ("10.1.2.4".to_string(), HostState::Unknown, true),
                ("10.1.2.5".to_string(), HostState::Alive, false),
            ]
        );
    }

    #[tokio::test]
    async fn test_oversized_thread_count_is_clamped() {
        let mut settings = settings(1);
        settings.threads = usize::MAX;
        let scan = ScanOrchestrator::new(ProbeRegistry::with_probes(vec![Box::new(OddAlive)]), &settings);
        assert_eq!(scan.threads, MAX_THREADS);

        let range: AddressRange = "10.1.2.0/30".parse().unwrap();
        let report = scan.run(&range, None, &CancellationToken::new(), None).await;
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.threads, MAX_THREADS);
    }

    #[test]
    fn test_phase_order() {
        assert!(ScanPhase::Idle < ScanPhase::Dispatching);
        assert!(ScanPhase::Draining < ScanPhase::Reconciling);
        assert!(ScanPhase::Sorted < ScanPhase::Done);
        assert_eq!(ScanPhase::Draining.to_string(), "draining");
    }
}
