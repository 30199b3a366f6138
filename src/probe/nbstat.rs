//! NetBIOS node status (NBSTAT) probe.
//!
//! Sends one RFC 1002 node status request for the wildcard name `*` to
//! UDP port 137 and reads the name table from the answer. Any reply
//! proves the host alive; the name table then yields the machine name,
//! the workgroup and usually the adapter MAC.
//!
//! Response layout, after the 12-byte header:
//!
//! ```text
//! RR_NAME    variable (echo of the question name)
//! RR_TYPE    2 bytes  0x0021
//! RR_CLASS   2 bytes  0x0001
//! TTL        4 bytes
//! RDLENGTH   2 bytes
//! NUM_NAMES  1 byte
//! NAME       18 bytes each: 15-byte padded name, suffix, 2 flag bytes
//! UNIT_ID    6 bytes, usually the MAC address
//! ```

use crate::error::{ProbeError, ProbeResult};
use crate::probe::traits::{Probe, ProbeKind};
use crate::types::{HostInfo, HostState, IdentityPolicy};
use async_trait::async_trait;
use pnet::util::MacAddr;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// NetBIOS name service port.
pub const NBNS_PORT: u16 = 137;

const HEADER_LEN: usize = 12;
const NAME_RECORD_LEN: usize = 18;
const NAME_LEN: usize = 15;
const RR_NBSTAT_IN: [u8; 4] = [0x00, 0x21, 0x00, 0x01];

/// Name with suffix 0x01 registered by master browsers (`\x01\x02__MSBROWSE__\x02`).
const MS_BROWSE: [u8; NAME_LEN] = [
    0x01, 0x02, 0x5F, 0x5F, 0x4D, 0x53, 0x42, 0x52, 0x4F, 0x57, 0x53, 0x45, 0x5F, 0x5F, 0x02,
];

/// Build a node status request with the given transaction id.
pub fn build_request(transaction_id: u16) -> Vec<u8> {
    let mut packet = Vec::with_capacity(50);
    packet.extend_from_slice(&transaction_id.to_be_bytes());
    // flags, QDCOUNT=1, ANCOUNT, NSCOUNT, ARCOUNT
    packet.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    // "*" in first-level encoding, padded with encoded NULs
    packet.push(0x20);
    packet.extend_from_slice(b"CK");
    packet.extend_from_slice(&[b'A'; 30]);
    packet.push(0x00);
    packet.extend_from_slice(&RR_NBSTAT_IN);
    packet
}

/// Interpret a node status response and record what it reveals on `host`.
///
/// A header too short to read, unexpected question/answer counts, a
/// missing NBSTAT record and a truncated name table are protocol errors.
/// An empty RDATA section or an empty name table is not.
pub fn parse_status_response(
    buf: &[u8],
    host: &mut HostInfo,
    policy: IdentityPolicy,
) -> ProbeResult<()> {
    if buf.len() <= HEADER_LEN {
        return Err(ProbeError::Protocol("NBNS header too short".into()));
    }
    let qdcount = u16::from_be_bytes([buf[4], buf[5]]);
    let ancount = u16::from_be_bytes([buf[6], buf[7]]);
    if qdcount != 0 || ancount != 1 {
        return Err(ProbeError::Protocol(format!(
            "unexpected NBNS counts (questions {qdcount}, answers {ancount})"
        )));
    }

    let record = buf[HEADER_LEN..]
        .windows(RR_NBSTAT_IN.len())
        .position(|w| w == RR_NBSTAT_IN)
        .ok_or_else(|| ProbeError::Protocol("no NBSTAT record in NBNS answer".into()))?;
    let mut pos = HEADER_LEN + record + RR_NBSTAT_IN.len();

    // TTL (4), RDLENGTH (2), NUM_NAMES (1)
    if buf.len() < pos + 7 {
        return Err(ProbeError::Protocol("unexpected end of NBNS answer".into()));
    }
    pos += 4;
    let rdlength = u16::from_be_bytes([buf[pos], buf[pos + 1]]);
    if rdlength < 16 {
        return Ok(());
    }
    pos += 2;
    let num_names = buf[pos] as usize;
    if num_names == 0 {
        return Ok(());
    }
    pos += 1;

    for _ in 0..num_names {
        let Some(record) = buf.get(pos..pos + NAME_RECORD_LEN) else {
            return Err(ProbeError::Protocol("truncated NBNS name table".into()));
        };
        let name = &record[..NAME_LEN];
        match record[NAME_LEN] {
            0x00 => {
                let text = String::from_utf8_lossy(name).trim().to_string();
                if !text.is_empty() {
                    if record[NAME_LEN + 1] & 0x80 != 0 {
                        host.set_workgroup(text, policy);
                    } else {
                        host.set_host_name(text, policy);
                    }
                }
            }
            0x01 if name == MS_BROWSE => {
                host.add_comment("MS CIFS Browser Protocol (MS-BRWS)");
            }
            _ => {}
        }
        pos += NAME_RECORD_LEN;
    }

    if let Some(unit) = buf.get(pos..pos + 6) {
        let mac = MacAddr::new(unit[0], unit[1], unit[2], unit[3], unit[4], unit[5]);
        if mac != MacAddr::zero() {
            host.set_mac(mac);
        }
    }

    Ok(())
}

/// NetBIOS node status probe. IPv4 only; IPv6 hosts are skipped.
pub struct NbstatProbe {
    policy: IdentityPolicy,
}

impl NbstatProbe {
    pub fn new(policy: IdentityPolicy) -> Self {
        Self { policy }
    }

    async fn query(&self, target: Ipv4Addr, timeout: Duration) -> ProbeResult<Option<Vec<u8>>> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
        socket.connect(SocketAddr::from((target, NBNS_PORT))).await?;
        socket.send(&build_request(rand::random())).await?;

        let mut buf = vec![0u8; 512];
        match tokio::time::timeout(timeout, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                trace!(address = %target, "no NBNS answer");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Probe for NbstatProbe {
    fn name(&self) -> &'static str {
        ProbeKind::Nbstat.name()
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
        let IpAddr::V4(target) = host.address else {
            return Ok(());
        };

        let answer = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            answer = self.query(target, timeout) => answer?,
        };

        match answer {
            Some(buf) => {
                host.raise_state(HostState::Alive);
                if buf.is_empty() {
                    return Ok(());
                }
                parse_status_response(&buf, host, self.policy)
            }
            None => Ok(()),
        }
    }
}
