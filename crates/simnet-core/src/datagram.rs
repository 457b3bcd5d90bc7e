//! The network-layer datagram envelope.

use core::fmt;
use std::net::Ipv4Addr;

use crate::constants::BASE_HEADER_LEN;

/// Upper-layer protocol identifier carried in every datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolId(pub u8);

impl ProtocolId {
    pub const ICMP: ProtocolId = ProtocolId(1);
    pub const IGMP: ProtocolId = ProtocolId(2);
    pub const TCP: ProtocolId = ProtocolId(6);
    pub const UDP: ProtocolId = ProtocolId(17);
    pub const RSVP: ProtocolId = ProtocolId(46);
    pub const MANET: ProtocolId = ProtocolId(138);
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A datagram: addressing, hop limit, fragmentation metadata and payload.
///
/// `fragment_offset` is in bytes and is always a multiple of
/// [`FRAGMENT_UNIT`](crate::constants::FRAGMENT_UNIT) for non-final fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: ProtocolId,
    pub ttl: u8,
    pub identification: u16,
    pub fragment_offset: u16,
    pub more_fragments: bool,
    pub dont_fragment: bool,
    pub options: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Datagram {
    /// Create an unfragmented datagram with no options.
    pub fn new(
        source: Ipv4Addr,
        destination: Ipv4Addr,
        protocol: ProtocolId,
        ttl: u8,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            source,
            destination,
            protocol,
            ttl,
            identification: 0,
            fragment_offset: 0,
            more_fragments: false,
            dont_fragment: false,
            options: Vec::new(),
            payload,
        }
    }

    #[must_use]
    pub fn with_identification(mut self, identification: u16) -> Self {
        self.identification = identification;
        self
    }

    #[must_use]
    pub fn with_dont_fragment(mut self, dont_fragment: bool) -> Self {
        self.dont_fragment = dont_fragment;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<u8>) -> Self {
        self.options = options;
        self
    }

    /// Header length in bytes, options padded to a 4-byte boundary.
    #[must_use]
    pub fn header_len(&self) -> usize {
        BASE_HEADER_LEN + self.options.len().div_ceil(4) * 4
    }

    /// Header plus payload.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.header_len() + self.payload.len()
    }

    /// Whether this datagram is one piece of a larger one.
    #[must_use]
    pub fn is_fragment(&self) -> bool {
        self.fragment_offset != 0 || self.more_fragments
    }

    #[must_use]
    pub fn is_multicast(&self) -> bool {
        self.destination.is_multicast()
    }
}

impl fmt::Display for Datagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} proto={} ttl={} id={} off={}{} len={}",
            self.source,
            self.destination,
            self.protocol,
            self.ttl,
            self.identification,
            self.fragment_offset,
            if self.more_fragments { " MF" } else { "" },
            self.total_len()
        )
    }
}
