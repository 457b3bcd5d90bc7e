//! Interface table: the host's network attachments.

use core::fmt;
use std::net::Ipv4Addr;

use crate::address::Ipv4Network;
use crate::constants::{DEFAULT_MTU, MAX_HEADER_LEN};
use crate::error::InterfaceError;

/// Lightweight interface identifier, assigned by [`InterfaceTable::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub u32);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// One network attachment of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceEntry {
    id: InterfaceId,
    pub name: String,
    pub address: Ipv4Addr,
    pub prefix_len: u8,
    /// Maximum transfer size in bytes, header included.
    pub mtu: usize,
    pub broadcast: bool,
    pub loopback: bool,
    pub multicast_groups: Vec<Ipv4Addr>,
}

impl InterfaceEntry {
    pub fn new(name: impl Into<String>, address: Ipv4Addr, prefix_len: u8) -> Self {
        Self {
            id: InterfaceId(0),
            name: name.into(),
            address,
            prefix_len: prefix_len.min(32),
            mtu: DEFAULT_MTU,
            broadcast: false,
            loopback: false,
            multicast_groups: Vec::new(),
        }
    }

    /// A loopback attachment on 127.0.0.1/8.
    pub fn loopback(name: impl Into<String>) -> Self {
        let mut entry = Self::new(name, Ipv4Addr::LOCALHOST, 8);
        entry.loopback = true;
        entry.mtu = 3924;
        entry
    }

    #[must_use]
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    #[must_use]
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Identifier assigned by the owning table.
    pub fn id(&self) -> InterfaceId {
        self.id
    }

    pub fn network(&self) -> Ipv4Network {
        Ipv4Network::new(self.address, self.prefix_len).unwrap_or(Ipv4Network::host(self.address))
    }

    /// Directed broadcast address, if the interface can broadcast.
    #[must_use]
    pub fn directed_broadcast(&self) -> Option<Ipv4Addr> {
        (self.broadcast && self.prefix_len < 32).then(|| self.network().broadcast())
    }

    #[must_use]
    pub fn is_member_of(&self, group: Ipv4Addr) -> bool {
        self.multicast_groups.contains(&group)
    }

    /// Join a multicast group. Returns false if already a member.
    pub fn join_group(&mut self, group: Ipv4Addr) -> bool {
        if self.is_member_of(group) {
            return false;
        }
        self.multicast_groups.push(group);
        true
    }
}

/// Ordered table of the host's interfaces.
#[derive(Debug, Default, Clone)]
pub struct InterfaceTable {
    entries: Vec<InterfaceEntry>,
}

impl InterfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interface and assign it the next identifier.
    pub fn add(&mut self, mut entry: InterfaceEntry) -> Result<InterfaceId, InterfaceError> {
        if self.by_name(&entry.name).is_some() {
            return Err(InterfaceError::DuplicateName(entry.name));
        }
        if entry.mtu <= MAX_HEADER_LEN {
            return Err(InterfaceError::InvalidMtu {
                name: entry.name,
                mtu: entry.mtu,
            });
        }
        let id = InterfaceId(self.entries.len() as u32);
        entry.id = id;
        self.entries.push(entry);
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: InterfaceId) -> Option<&InterfaceEntry> {
        self.entries.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: InterfaceId) -> Option<&mut InterfaceEntry> {
        self.entries.get_mut(id.0 as usize)
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&InterfaceEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Resolve a name to an id, failing loudly for unknown names.
    pub fn id_of(&self, name: &str) -> Result<InterfaceId, InterfaceError> {
        self.by_name(name)
            .map(InterfaceEntry::id)
            .ok_or_else(|| InterfaceError::UnknownName(name.to_string()))
    }

    /// The interface holding `addr` as its own address.
    #[must_use]
    pub fn by_address(&self, addr: Ipv4Addr) -> Option<&InterfaceEntry> {
        if addr.is_unspecified() {
            return None;
        }
        self.entries.iter().find(|e| e.address == addr)
    }

    /// Whether a unicast or broadcast datagram to `addr` is for this host.
    ///
    /// True for any interface address, loopback, limited broadcast, and the
    /// directed broadcast of a broadcast-capable interface.
    #[must_use]
    pub fn is_local_address(&self, addr: Ipv4Addr) -> bool {
        if addr.is_loopback() || addr.is_broadcast() {
            return true;
        }
        self.by_address(addr).is_some()
            || self
                .entries
                .iter()
                .any(|e| e.directed_broadcast() == Some(addr))
    }

    /// Whether any interface has joined the multicast group `addr`.
    #[must_use]
    pub fn is_local_multicast(&self, addr: Ipv4Addr) -> bool {
        self.entries.iter().any(|e| e.is_member_of(addr))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InterfaceEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
