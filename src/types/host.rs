//! Per-host scan records and the liveness lattice.

use pnet::util::MacAddr;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;

/// Liveness of a host, ordered `Dead < Unknown < Alive`.
///
/// A host only ever moves up this order. A positive signal from one probe
/// is never erased by the silence of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    /// No probe produced any signal.
    Dead,
    /// Seen only passively, e.g. in the neighbor table.
    Unknown,
    /// At least one active probe got an answer.
    Alive,
}

impl HostState {
    /// Combine the current state with a proposed one.
    ///
    /// Only upward moves take effect; same-state and downward proposals
    /// leave the current state in place.
    pub fn promote(self, proposed: HostState) -> HostState {
        self.max(proposed)
    }
}

impl Default for HostState {
    fn default() -> Self {
        Self::Dead
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dead => write!(f, "dead"),
            Self::Unknown => write!(f, "unknown"),
            Self::Alive => write!(f, "alive"),
        }
    }
}

/// What to do when a probe reports a host name or workgroup that differs
/// from one already recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityPolicy {
    /// The later value replaces the earlier one.
    #[default]
    Overwrite,
    /// The earlier value stays; the later one is appended as a comment.
    KeepFirst,
}

/// Everything learned about one address during a run.
///
/// Probes mutate this record in place. Fields are only ever added to or
/// raised, never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub address: IpAddr,
    state: HostState,
    #[serde(serialize_with = "serialize_mac")]
    pub mac: Option<MacAddr>,
    pub host_name: Option<String>,
    pub workgroup: Option<String>,
    pub comments: Vec<String>,
}

impl HostInfo {
    /// Create a fresh record in the `Dead` state.
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            state: HostState::Dead,
            mac: None,
            host_name: None,
            workgroup: None,
            comments: Vec::new(),
        }
    }

    /// Create a record for an address seen only in the neighbor table.
    pub fn passive(address: IpAddr, mac: MacAddr) -> Self {
        let mut host = Self::new(address);
        host.raise_state(HostState::Unknown);
        host.mac = Some(mac);
        host
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// Propose a new state; see [`HostState::promote`].
    pub fn raise_state(&mut self, proposed: HostState) {
        self.state = self.state.promote(proposed);
    }

    pub fn is_dead(&self) -> bool {
        self.state == HostState::Dead
    }

    /// Append a free-form diagnostic line.
    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }

    /// Record the link-layer address.
    ///
    /// A different address arriving on top of an existing one is kept as a
    /// comment instead.
    pub fn set_mac(&mut self, mac: MacAddr) {
        match self.mac {
            Some(existing) if existing != mac => {
                self.add_comment(format!("additional MAC address: {mac}"));
            }
            _ => self.mac = Some(mac),
        }
    }

    pub fn set_host_name(&mut self, name: impl Into<String>, policy: IdentityPolicy) {
        let name = name.into();
        if let Some(conflict) = apply_identity(&mut self.host_name, name, policy) {
            self.add_comment(format!("additional host name: {conflict}"));
        }
    }

    pub fn set_workgroup(&mut self, workgroup: impl Into<String>, policy: IdentityPolicy) {
        let workgroup = workgroup.into();
        if let Some(conflict) = apply_identity(&mut self.workgroup, workgroup, policy) {
            self.add_comment(format!("additional workgroup: {conflict}"));
        }
    }
}

/// Store `value` in `slot` under `policy`, returning a rejected value.
fn apply_identity(
    slot: &mut Option<String>,
    value: String,
    policy: IdentityPolicy,
) -> Option<String> {
    match (slot.as_ref(), policy) {
        (Some(existing), IdentityPolicy::KeepFirst) if *existing != value => Some(value),
        _ => {
            *slot = Some(value);
            None
        }
    }
}

fn serialize_mac<S: Serializer>(mac: &Option<MacAddr>, serializer: S) -> Result<S::Ok, S::Error> {
    match mac {
        Some(mac) => serializer.serialize_some(&mac.to_string()),
        None => serializer.serialize_none(),
    }
}
