//! Unit address validation (SSRF and DNS-rebinding protection).
//!
//! # Responsibilities
//! - Classify IP literals against private/internal ranges
//! - Resolve hostnames once and reject them if any answer is internal
//! - Hand the orchestrator a single IP to dial, so no second lookup happens
//!
//! # Design Decisions
//! - Fail closed: resolution errors and empty answers are rejections
//! - IPv4-mapped IPv6 addresses are classified as their IPv4 form
//! - [`ValidatedAddress`] can only be built here; the upstream client only
//!   accepts that type

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;

/// IPv4 networks that must never be dialed.
const BLOCKED_V4: [(Ipv4Addr, u32); 5] = [
    (Ipv4Addr::new(127, 0, 0, 0), 8),    // loopback
    (Ipv4Addr::new(10, 0, 0, 0), 8),     // RFC 1918
    (Ipv4Addr::new(172, 16, 0, 0), 12),  // RFC 1918
    (Ipv4Addr::new(192, 168, 0, 0), 16), // RFC 1918
    (Ipv4Addr::new(169, 254, 0, 0), 16), // link-local
];

/// IPv6 networks that must never be dialed.
const BLOCKED_V6: [(Ipv6Addr, u32); 3] = [
    (Ipv6Addr::LOCALHOST, 128),                     // loopback
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),  // unique local
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10), // link-local
];

/// Why a unit address was refused.
///
/// Messages never include the address itself.
#[derive(Debug, thiserror::Error)]
pub enum UnsafeAddress {
    #[error("unit address is empty")]
    Empty,
    #[error("unit hostname is not permitted")]
    ForbiddenHostname,
    #[error("unit IP is in a private/internal network range")]
    PrivateIp,
    #[error("unit hostname resolves to a private/internal network")]
    PrivateResolution,
    #[error("unit hostname did not resolve to any address")]
    Unresolvable,
    #[error("unit hostname lookup failed: {0}")]
    LookupFailed(#[source] io::Error),
}

/// An IP that passed validation. The only thing the upstream client dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedAddress(IpAddr);

impl ValidatedAddress {
    pub fn ip(&self) -> IpAddr {
        self.0
    }

    /// Socket address for `port`; IPv6 formats with brackets.
    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.0, port)
    }

    #[cfg(test)]
    pub(crate) fn unchecked(ip: IpAddr) -> Self {
        Self(ip)
    }
}

impl fmt::Display for ValidatedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hostname resolution used by the validator.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the system (tokio's `lookup_host`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Decides whether a unit's recorded address is safe to connect to.
#[derive(Clone)]
pub struct AddressValidator {
    resolver: Arc<dyn Resolve>,
}

impl AddressValidator {
    pub fn new(resolver: Arc<dyn Resolve>) -> Self {
        Self { resolver }
    }

    /// Validator using the system resolver.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemResolver))
    }

    /// Validate `address` and return the single IP to dial.
    pub async fn validate(&self, address: &str) -> Result<ValidatedAddress, UnsafeAddress> {
        let candidate = address.trim();
        if candidate.is_empty() {
            return Err(UnsafeAddress::Empty);
        }

        if let Some(ip) = parse_ip_literal(candidate) {
            return if is_private_ip(ip) {
                Err(UnsafeAddress::PrivateIp)
            } else {
                Ok(ValidatedAddress(ip))
            };
        }

        if candidate.eq_ignore_ascii_case("localhost") || candidate == "0.0.0.0" {
            return Err(UnsafeAddress::ForbiddenHostname);
        }

        let resolved = self
            .resolver
            .lookup(candidate)
            .await
            .map_err(UnsafeAddress::LookupFailed)?;

        let first = *resolved.first().ok_or(UnsafeAddress::Unresolvable)?;
        if resolved.iter().any(|ip| is_private_ip(*ip)) {
            return Err(UnsafeAddress::PrivateResolution);
        }

        Ok(ValidatedAddress(first))
    }
}

impl fmt::Debug for AddressValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressValidator").finish_non_exhaustive()
    }
}

/// Accepts bare literals and bracketed IPv6 (`[2001:db8::1]`).
fn parse_ip_literal(candidate: &str) -> Option<IpAddr> {
    let unbracketed = candidate
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(candidate);
    unbracketed.parse().ok()
}

/// True if `ip` is loopback, link-local, unspecified or inside a blocked range.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_private_v4(v4),
            None => is_private_v6(v6),
        },
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    if ip.is_loopback() || ip.is_link_local() || ip.is_unspecified() {
        return true;
    }
    // 224.0.0.0/24 is link-local multicast.
    if in_v4_network(ip, Ipv4Addr::new(224, 0, 0, 0), 24) {
        return true;
    }
    BLOCKED_V4
        .iter()
        .any(|(net, prefix)| in_v4_network(ip, *net, *prefix))
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    // Link-local multicast: ffX2::/16.
    let segments = ip.segments();
    if segments[0] & 0xff0f == 0xff02 {
        return true;
    }
    BLOCKED_V6
        .iter()
        .any(|(net, prefix)| in_v6_network(ip, *net, *prefix))
}

fn in_v4_network(ip: Ipv4Addr, net: Ipv4Addr, prefix: u32) -> bool {
    let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
    u32::from(ip) & mask == u32::from(net) & mask
}

fn in_v6_network(ip: Ipv6Addr, net: Ipv6Addr, prefix: u32) -> bool {
    let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
    u128::from(ip) & mask == u128::from(net) & mask
}
