//! Address range resolution for CIDR blocks and single addresses.
//!
//! Turns user input such as `192.168.1.0/24`, `fd00::/120` or `10.0.0.7`
//! into a bounded, inclusive interval of scannable host addresses:
//!
//! - IPv4 ranges wider than two addresses exclude the network and
//!   broadcast addresses.
//! - IPv6 ranges keep every address.
//! - `/31` and `/127` yield both addresses, `/32` and `/128` yield one.
//!
//! Only private-use networks are accepted and a range may hold at most
//! [`AddressRange::MAX_HOSTS`] addresses.

use crate::error::{RangeError, RangeResult};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Which address blocks count as "local" for the private-network guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPolicy {
    /// Also accept link-local blocks (169.254.0.0/16, fe80::/10).
    pub allow_link_local: bool,
}

impl AddressPolicy {
    /// Check whether `addr` may be scanned under this policy.
    ///
    /// IPv4 accepts the RFC 1918 blocks, IPv6 accepts unique-local
    /// addresses (fc00::/7). Loopback is never accepted.
    pub fn permits(&self, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => v4.is_private() || (self.allow_link_local && v4.is_link_local()),
            IpAddr::V6(v6) => {
                is_unique_local(&v6) || (self.allow_link_local && is_unicast_link_local(&v6))
            }
        }
    }
}

fn is_unique_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

fn is_unicast_link_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

/// An immutable, bounded interval of host addresses to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    cidr: IpNetwork,
    first: IpAddr,
    last: IpAddr,
    host_count: u32,
}

impl AddressRange {
    /// Maximum number of host bits in a range (/16 for IPv4, /112 for IPv6).
    pub const MAX_HOST_BITS: u32 = 16;

    /// Maximum number of addresses a range may hold.
    pub const MAX_HOSTS: u32 = 1 << Self::MAX_HOST_BITS;

    /// Resolve a CIDR block or a bare address under the given policy.
    pub fn parse(input: &str, policy: AddressPolicy) -> RangeResult<Self> {
        let input = input.trim();
        let cidr = parse_network(input)?;
        let range = Self::from_network(cidr)?;

        for addr in [range.first, range.last] {
            if !policy.permits(addr) {
                return Err(RangeError::NotPrivateNetwork(addr));
            }
        }

        Ok(range)
    }

    /// Compute host bounds from an already masked network.
    fn from_network(cidr: IpNetwork) -> RangeResult<Self> {
        let network = cidr.network();
        let width = address_width(network);
        let host_bits = width - u32::from(cidr.prefix());

        if host_bits > Self::MAX_HOST_BITS {
            return Err(RangeError::RangeTooLarge {
                host_bits,
                max_hosts: Self::MAX_HOSTS,
            });
        }

        let overflow = || RangeError::AddressSyntax(cidr.to_string());

        let (first, last, host_count) = match host_bits {
            0 => (network, network, 1),
            1 => (network, successor(network).ok_or_else(overflow)?, 2),
            _ => {
                let all_ones = last_in_block(network, host_bits);
                let size = 1u32 << host_bits;
                match network {
                    IpAddr::V4(_) => (
                        successor(network).ok_or_else(overflow)?,
                        predecessor(all_ones).ok_or_else(overflow)?,
                        size - 2,
                    ),
                    IpAddr::V6(_) => (network, all_ones, size),
                }
            }
        };

        Ok(Self {
            cidr,
            first,
            last,
            host_count,
        })
    }

    /// The masked network prefix this range was derived from.
    pub fn cidr(&self) -> IpNetwork {
        self.cidr
    }

    /// First scannable address (inclusive).
    pub fn first_host(&self) -> IpAddr {
        self.first
    }

    /// Last scannable address (inclusive).
    pub fn last_host(&self) -> IpAddr {
        self.last
    }

    /// Exact number of addresses [`hosts`](Self::hosts) yields.
    pub fn host_count(&self) -> u32 {
        self.host_count
    }

    pub fn is_ipv6(&self) -> bool {
        self.first.is_ipv6()
    }

    /// Check whether `addr` lies within `first_host..=last_host`.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (addr, self.first, self.last) {
            (IpAddr::V4(a), IpAddr::V4(f), IpAddr::V4(l)) => f <= a && a <= l,
            (IpAddr::V6(a), IpAddr::V6(f), IpAddr::V6(l)) => f <= a && a <= l,
            _ => false,
        }
    }

    /// Iterate over every host address, in ascending order.
    ///
    /// The iterator is derived from the stored bounds, so calling this
    /// again always restarts from the first host.
    pub fn hosts(&self) -> Hosts {
        Hosts {
            next: Some(self.first),
            last: self.last,
            remaining: self.host_count,
        }
    }
}

impl FromStr for AddressRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, AddressPolicy::default())
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cidr)
    }
}

/// Forward iterator over the addresses of an [`AddressRange`].
#[derive(Debug, Clone)]
pub struct Hosts {
    next: Option<IpAddr>,
    last: IpAddr,
    remaining: u32,
}

impl Iterator for Hosts {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        let current = self.next?;
        // Stop at the last host, or when the address space has no successor.
        self.next = if current == self.last {
            None
        } else {
            successor(current)
        };
        self.remaining = self.remaining.saturating_sub(1);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(_) => (0, Some(self.remaining as usize)),
            None => (0, Some(0)),
        }
    }
}

/// Parse `addr/prefix` or a bare address into a masked network.
fn parse_network(input: &str) -> RangeResult<IpNetwork> {
    let syntax = || RangeError::AddressSyntax(input.to_string());

    let (addr, prefix) = match input.split_once('/') {
        Some((addr_str, prefix_str)) => {
            let addr: IpAddr = addr_str.parse().map_err(|_| syntax())?;
            if !is_decimal_prefix(prefix_str) {
                return Err(syntax());
            }
            let prefix: u8 = prefix_str.parse().map_err(|_| syntax())?;
            (addr, prefix)
        }
        None => {
            let addr: IpAddr = input.parse().map_err(|_| syntax())?;
            (addr, address_width(addr) as u8)
        }
    };

    let unmasked = IpNetwork::new(addr, prefix).map_err(|_| syntax())?;
    IpNetwork::new(unmasked.network(), prefix).map_err(|_| syntax())
}

/// Plain decimal digits without a sign or a leading zero.
fn is_decimal_prefix(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && (s == "0" || !s.starts_with('0'))
}

fn address_width(addr: IpAddr) -> u32 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// The address with every host bit set (`network | !mask`).
fn last_in_block(network: IpAddr, host_bits: u32) -> IpAddr {
    match network {
        IpAddr::V4(v4) => {
            let host_mask = (1u32 << host_bits) - 1;
            IpAddr::V4(Ipv4Addr::from(u32::from(v4) | host_mask))
        }
        IpAddr::V6(v6) => {
            let host_mask = (1u128 << host_bits) - 1;
            IpAddr::V6(Ipv6Addr::from(u128::from(v6) | host_mask))
        }
    }
}

/// The next address, or `None` at the top of the address space.
pub(crate) fn successor(addr: IpAddr) -> Option<IpAddr> {
    match addr {
        IpAddr::V4(v4) => u32::from(v4)
            .checked_add(1)
            .map(|n| IpAddr::V4(Ipv4Addr::from(n))),
        IpAddr::V6(v6) => u128::from(v6)
            .checked_add(1)
            .map(|n| IpAddr::V6(Ipv6Addr::from(n))),
    }
}

/// The previous address, or `None` at the bottom of the address space.
pub(crate) fn predecessor(addr: IpAddr) -> Option<IpAddr> {
    match addr {
        IpAddr::V4(v4) => u32::from(v4)
            .checked_sub(1)
            .map(|n| IpAddr::V4(Ipv4Addr::from(n))),
        IpAddr::V6(v6) => u128::from(v6)
            .checked_sub(1)
            .map(|n| IpAddr::V6(Ipv6Addr::from(n))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(s: &str) -> RangeResult<AddressRange> {
        s.parse()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_cidr_v4_24() {
        let range = resolve("192.168.1.0/24").unwrap();
        assert_eq!(range.first_host(), ip("192.168.1.1"));
        assert_eq!(range.last_host(), ip("192.168.1.254"));
        assert_eq!(range.host_count(), 254);
        assert_eq!(range.cidr().to_string(), "192.168.1.0/24");
    }

    #[test]
    fn test_parse_cidr_v4_31() {
        let range = resolve("192.168.1.0/31").unwrap();
        assert_eq!(range.first_host(), ip("192.168.1.0"));
        assert_eq!(range.last_host(), ip("192.168.1.1"));
        assert_eq!(range.host_count(), 2);
    }

    #[test]
    fn test_parse_cidr_v4_32() {
        let range = resolve("192.168.1.5/32").unwrap();
        assert_eq!(range.first_host(), ip("192.168.1.5"));
        assert_eq!(range.last_host(), ip("192.168.1.5"));
        assert_eq!(range.host_count(), 1);
        assert_eq!(range.cidr().to_string(), "192.168.1.5/32");
    }

    #[test]
    fn test_parse_masks_host_bits() {
        let range = resolve("10.6.5.7/28").unwrap();
        assert_eq!(range.cidr().to_string(), "10.6.5.0/28");
        assert_eq!(range.first_host(), ip("10.6.5.1"));
        assert_eq!(range.last_host(), ip("10.6.5.14"));

        let range = resolve("192.168.1.5/31").unwrap();
        assert_eq!(range.first_host(), ip("192.168.1.4"));
        assert_eq!(range.host_count(), 2);
    }

    #[test]
    fn test_parse_cidr_v4_multi_octet() {
        let range = resolve("192.168.0.0/23").unwrap();
        assert_eq!(range.first_host(), ip("192.168.0.1"));
        assert_eq!(range.last_host(), ip("192.168.1.254"));
        assert_eq!(range.host_count(), 510);

        let range = resolve("10.0.0.0/30").unwrap();
        assert_eq!(range.first_host(), ip("10.0.0.1"));
        assert_eq!(range.last_host(), ip("10.0.0.2"));
    }

    #[test]
    fn test_parse_cidr_v6_no_exclusion() {
        let range = resolve("fd00:abcd:1234::/120").unwrap();
        assert_eq!(range.first_host(), ip("fd00:abcd:1234::"));
        assert_eq!(range.last_host(), ip("fd00:abcd:1234::ff"));
        assert_eq!(range.host_count(), 256);
        assert!(range.is_ipv6());
    }

    #[test]
    fn test_parse_v6_largest_allowed() {
        let range = resolve("fd00:db8::/112").unwrap();
        assert_eq!(range.host_count(), 65536);

        let range = resolve("fd00::1/127").unwrap();
        assert_eq!(range.first_host(), ip("fd00::"));
        assert_eq!(range.last_host(), ip("fd00::1"));
    }

    #[test]
    fn test_parse_single_address() {
        let range = resolve("10.11.22.3").unwrap();
        assert_eq!(range.first_host(), ip("10.11.22.3"));
        assert_eq!(range.last_host(), ip("10.11.22.3"));
        assert_eq!(range.host_count(), 1);
        assert_eq!(range.cidr().to_string(), "10.11.22.3/32");

        let range = resolve(" fd12::7 ").unwrap();
        assert_eq!(range.host_count(), 1);
    }

    #[test]
    fn test_host_count_formula() {
        for prefix in 16u32..=32 {
            let range = resolve(&format!("10.20.0.0/{prefix}")).unwrap();
            let h = 32 - prefix;
            let expected = match h {
                0 => 1,
                1 => 2,
                _ => (1u32 << h) - 2,
            };
            assert_eq!(range.host_count(), expected, "prefix /{prefix}");
        }
        for prefix in 112u32..=128 {
            let range = resolve(&format!("fd00:1::/{prefix}")).unwrap();
            let h = 128 - prefix;
            let expected = if h == 0 { 1 } else { 1u32 << h };
            assert_eq!(range.host_count(), expected, "prefix /{prefix}");
        }
    }

    #[test]
    fn test_range_too_large() {
        assert!(matches!(
            resolve("10.0.0.0/8"),
            Err(RangeError::RangeTooLarge { host_bits: 24, .. })
        ));
        assert!(matches!(
            resolve("fd00:db8::/32"),
            Err(RangeError::RangeTooLarge { .. })
        ));
        assert!(resolve("192.168.0.0/8").is_err());
        assert!(resolve("fe80::/10").is_err());
    }

    #[test]
    fn test_not_private() {
        assert_eq!(
            resolve("8.8.8.8"),
            Err(RangeError::NotPrivateNetwork(ip("8.8.8.8")))
        );
        assert!(matches!(
            resolve("127.0.0.1"),
            Err(RangeError::NotPrivateNetwork(_))
        ));
        assert!(matches!(
            resolve("2001:db8::/120"),
            Err(RangeError::NotPrivateNetwork(_))
        ));
    }

    #[test]
    fn test_link_local_policy() {
        assert!(matches!(
            resolve("169.254.10.0/24"),
            Err(RangeError::NotPrivateNetwork(_))
        ));
        assert!(matches!(
            resolve("fe80::/120"),
            Err(RangeError::NotPrivateNetwork(_))
        ));

        let policy = AddressPolicy {
            allow_link_local: true,
        };
        assert!(AddressRange::parse("169.254.10.0/24", policy).is_ok());
        assert!(AddressRange::parse("fe80::/120", policy).is_ok());
    }

    #[test]
    fn test_syntax_errors() {
        for bad in [
            "192.168.256.0",
            "10.0.0.0/33",
            "192.168.256.0/255",
            "65535",
            "",
            "not-an-ip",
            "10.0.0.0/",
            "10.0.0.0/-1",
            "192.168.1.0/+24",
            "192.168.1.0/024",
            "192.168.1.0/ 24",
        ] {
            assert!(
                matches!(resolve(bad), Err(RangeError::AddressSyntax(_))),
                "expected syntax error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_hosts_sequence() {
        let range = resolve("10.6.5.7/28").unwrap();
        let hosts: Vec<String> = range.hosts().map(|a| a.to_string()).collect();
        let expected: Vec<String> = (1..=14).map(|i| format!("10.6.5.{i}")).collect();
        assert_eq!(hosts, expected);
    }

    #[test]
    fn test_hosts_matches_count_and_restarts() {
        for input in [
            "192.168.1.0/24",
            "192.168.1.0/31",
            "192.168.1.5/32",
            "fd00:abcd:1234::/120",
            "172.16.0.0/16",
        ] {
            let range = resolve(input).unwrap();
            let first: Vec<IpAddr> = range.hosts().collect();
            assert_eq!(first.len() as u32, range.host_count(), "{input}");
            assert_eq!(first.first(), Some(&range.first_host()));
            assert_eq!(first.last(), Some(&range.last_host()));
            assert!(first.windows(2).all(|w| w[0] < w[1]));

            let second: Vec<IpAddr> = range.hosts().collect();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_successor_stops_at_top() {
        assert_eq!(successor(ip("255.255.255.255")), None);
        assert_eq!(
            successor(ip("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff")),
            None
        );
        assert_eq!(predecessor(ip("0.0.0.0")), None);
        assert_eq!(successor(ip("10.0.0.255")), Some(ip("10.0.1.0")));
    }

    #[test]
    fn test_hosts_iterator_at_address_space_top() {
        let mut hosts = Hosts {
            next: Some(ip("255.255.255.254")),
            last: ip("255.255.255.255"),
            remaining: 2,
        };
        assert_eq!(hosts.next(), Some(ip("255.255.255.254")));
        assert_eq!(hosts.next(), Some(ip("255.255.255.255")));
        assert_eq!(hosts.next(), None);
    }

    #[test]
    fn test_contains() {
        let range = resolve("192.168.1.0/24").unwrap();
        assert!(range.contains(ip("192.168.1.1")));
        assert!(range.contains(ip("192.168.1.254")));
        assert!(!range.contains(ip("192.168.1.255")));
        assert!(!range.contains(ip("192.168.1.0")));
        assert!(!range.contains(ip("192.168.2.1")));
        assert!(!range.contains(ip("fd00::1")));
    }
}
