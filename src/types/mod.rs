//! Core type definitions.
//!
//! [`AddressRange`] is built once per run and never mutated afterwards.
//! [`HostInfo`] is the record every probe writes into.

mod host;
mod range;

pub use host::{HostInfo, HostState, IdentityPolicy};
pub use range::{AddressPolicy, AddressRange, Hosts};
