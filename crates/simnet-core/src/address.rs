//! IPv4 network prefixes and well-known group addresses.

use core::fmt;
use core::str::FromStr;
use std::net::Ipv4Addr;

use crate::error::AddressError;

/// All-hosts multicast group (224.0.0.1).
pub const ALL_HOSTS_MCAST: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 1);

/// All-routers multicast group (224.0.0.2).
pub const ALL_ROUTERS_MCAST: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 2);

/// Link-local MANET routers group (224.0.0.109).
pub const LL_MANET_ROUTERS: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 109);

/// Whether `addr` lies in the link-local multicast block 224.0.0.0/24.
///
/// Datagrams to these groups are never relayed past the first hop.
#[must_use]
pub fn is_link_local_multicast(addr: Ipv4Addr) -> bool {
    let [a, b, c, _] = addr.octets();
    a == 224 && b == 0 && c == 0
}

fn mask_bits(prefix_len: u8) -> u32 {
    u32::MAX
        .checked_shl(32u32.saturating_sub(u32::from(prefix_len)))
        .unwrap_or(0)
}

/// An IPv4 network: address plus prefix length.
///
/// The stored address is kept as given; host bits are ignored by
/// [`Ipv4Network::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct Ipv4Network {
    address: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Network {
    /// The default network 0.0.0.0/0, containing every address.
    pub const DEFAULT: Ipv4Network = Ipv4Network {
        address: Ipv4Addr::UNSPECIFIED,
        prefix_len: 0,
    };

    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, AddressError> {
        if prefix_len > 32 {
            return Err(AddressError::InvalidPrefixLength(prefix_len));
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }

    /// A /32 network holding exactly one address.
    pub const fn host(address: Ipv4Addr) -> Self {
        Self {
            address,
            prefix_len: 32,
        }
    }

    #[must_use]
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    #[must_use]
    pub fn netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from(mask_bits(self.prefix_len))
    }

    /// The address with host bits cleared.
    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & mask_bits(self.prefix_len))
    }

    /// The directed broadcast address of this network.
    #[must_use]
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) | !mask_bits(self.prefix_len))
    }

    /// Whether `addr` falls inside this network.
    #[must_use]
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        (u32::from(addr) ^ u32::from(self.address)) & mask_bits(self.prefix_len) == 0
    }
}

impl fmt::Display for Ipv4Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Network {
    type Err = AddressError;

    /// Parse `a.b.c.d/len`. A bare address is a /32.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::InvalidNetwork(s.to_string());
        let (addr, len) = match s.split_once('/') {
            Some((addr, len)) => (addr, len.parse::<u8>().map_err(|_| invalid())?),
            None => (s, 32),
        };
        let address = addr.trim().parse::<Ipv4Addr>().map_err(|_| invalid())?;
        Ipv4Network::new(address, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4Network {
        s.parse().unwrap()
    }

    #[test]
    fn contains_respects_prefix() {
        let n = net("10.1.0.0/16");
        assert!(n.contains(Ipv4Addr::new(10, 1, 2, 3)));
        assert!(n.contains(Ipv4Addr::new(10, 1, 255, 255)));
        assert!(!n.contains(Ipv4Addr::new(10, 2, 0, 1)));
    }

    #[test]
    fn default_network_contains_everything() {
        assert!(Ipv4Network::DEFAULT.contains(Ipv4Addr::new(192, 168, 0, 1)));
        assert!(Ipv4Network::DEFAULT.contains(Ipv4Addr::BROADCAST));
        assert_eq!(Ipv4Network::DEFAULT.netmask(), Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn host_network_contains_only_itself() {
        let n = Ipv4Network::host(Ipv4Addr::new(10, 0, 0, 5));
        assert!(n.contains(Ipv4Addr::new(10, 0, 0, 5)));
        assert!(!n.contains(Ipv4Addr::new(10, 0, 0, 4)));
        assert_eq!(n.netmask(), Ipv4Addr::BROADCAST);
    }

    #[test]
    fn host_bits_are_ignored() {
        let n = net("10.1.2.3/8");
        assert_eq!(n.network(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(n.broadcast(), Ipv4Addr::new(10, 255, 255, 255));
        assert!(n.contains(Ipv4Addr::new(10, 200, 0, 1)));
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(net("192.168.1.0/24").to_string(), "192.168.1.0/24");
        assert_eq!(net("192.168.1.7").prefix_len(), 32);
        assert_eq!(
            "10.0.0.0/33".parse::<Ipv4Network>(),
            Err(AddressError::InvalidPrefixLength(33))
        );
        assert!("10.0.0/8".parse::<Ipv4Network>().is_err());
        assert!("10.0.0.0/x".parse::<Ipv4Network>().is_err());
        assert!("".parse::<Ipv4Network>().is_err());
    }

    #[test]
    fn link_local_multicast_block() {
        assert!(is_link_local_multicast(ALL_HOSTS_MCAST));
        assert!(is_link_local_multicast(LL_MANET_ROUTERS));
        assert!(!is_link_local_multicast(Ipv4Addr::new(224, 0, 1, 1)));
        assert!(!is_link_local_multicast(Ipv4Addr::new(239, 1, 1, 1)));
    }
}
