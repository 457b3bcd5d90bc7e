//! Pipeline inputs, outputs and counters.

use core::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use simnet_core::constants::{DEFAULT_MULTICAST_TTL, DEFAULT_TTL};
use simnet_core::{Datagram, InterfaceId, ProtocolId};

use crate::constants::{DEFAULT_PROTOCOL_MAPPING, FRAGMENT_CHECK_INTERVAL, FRAGMENT_TIMEOUT, icmp};
use crate::hook::{HookPoint, QueueHandle};

/// Error conditions reported to the error-signalling collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSignal {
    /// TTL ran out in transit.
    TimeExceeded,
    /// No route to the destination.
    NoRoute,
    /// No upper layer handles the protocol.
    ProtocolUnreachable,
    /// Too large for the egress MTU with don't-fragment set.
    FragmentationNeeded { mtu: usize },
}

impl ErrorSignal {
    /// ICMP `(type, code)` for this condition.
    #[must_use]
    pub fn icmp_type_code(&self) -> (u8, u8) {
        match self {
            ErrorSignal::TimeExceeded => (icmp::TIME_EXCEEDED, icmp::TTL_EXCEEDED_IN_TRANSIT),
            ErrorSignal::NoRoute => (icmp::DESTINATION_UNREACHABLE, icmp::NET_UNREACHABLE),
            ErrorSignal::ProtocolUnreachable => {
                (icmp::DESTINATION_UNREACHABLE, icmp::PROTOCOL_UNREACHABLE)
            }
            ErrorSignal::FragmentationNeeded { .. } => {
                (icmp::DESTINATION_UNREACHABLE, icmp::FRAGMENTATION_ERROR_CODE)
            }
        }
    }
}

/// Decapsulated payload handed to an upper layer, with its control info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredPacket {
    pub payload: Vec<u8>,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: ProtocolId,
    /// TTL as received, after the ingress decrement.
    pub ttl: u8,
    /// `None` for datagrams this host sent to itself.
    pub in_iface: Option<InterfaceId>,
    pub options: Vec<u8>,
}

impl DeliveredPacket {
    pub(crate) fn from_datagram(datagram: Datagram, in_iface: Option<InterfaceId>) -> Self {
        Self {
            payload: datagram.payload,
            source: datagram.source,
            destination: datagram.destination,
            protocol: datagram.protocol,
            ttl: datagram.ttl,
            in_iface,
            options: datagram.options,
        }
    }
}

/// Action returned by the pipeline for the caller to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpAction {
    /// Hand a datagram (or fragment) to the link layer.
    ///
    /// `next_hop` is `None` when the destination is on-link.
    Transmit {
        interface: InterfaceId,
        next_hop: Option<Ipv4Addr>,
        datagram: Datagram,
    },
    /// Deliver a complete datagram to the upper layer on `gate`.
    DeliverLocal { gate: usize, packet: DeliveredPacket },
    /// Report an error about `datagram` to its originator.
    SignalError {
        signal: ErrorSignal,
        datagram: Datagram,
    },
    /// A hook suspended the datagram; re-inject it with `handle`.
    Queued { handle: QueueHandle, point: HookPoint },
}

/// An upper-layer request to send a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub destination: Ipv4Addr,
    /// Must be one of this host's addresses; filled in on egress when `None`.
    pub source: Option<Ipv4Addr>,
    pub protocol: ProtocolId,
    /// Defaults to the configured unicast or multicast TTL.
    pub ttl: Option<u8>,
    pub dont_fragment: bool,
    /// Pin the egress interface and bypass the route table.
    pub interface: Option<InterfaceId>,
    pub options: Vec<u8>,
    pub payload: Vec<u8>,
}

impl SendRequest {
    pub fn new(destination: Ipv4Addr, protocol: ProtocolId, payload: Vec<u8>) -> Self {
        Self {
            destination,
            source: None,
            protocol,
            ttl: None,
            dont_fragment: false,
            interface: None,
            options: Vec::new(),
            payload,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Ipv4Addr) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_dont_fragment(mut self, dont_fragment: bool) -> Self {
        self.dont_fragment = dont_fragment;
        self
    }

    #[must_use]
    pub fn with_interface(mut self, interface: InterfaceId) -> Self {
        self.interface = Some(interface);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<u8>) -> Self {
        self.options = options;
        self
    }
}

/// Counters kept for the lifetime of an [`IpLayer`](super::IpLayer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpStats {
    /// Multicast datagrams received from the network.
    pub multicast: u64,
    pub local_delivered: u64,
    pub dropped: u64,
    pub unroutable: u64,
    pub forwarded: u64,
}

impl fmt::Display for IpStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "forwarded {}, delivered {}, dropped {}, unroutable {}, multicast {}",
            self.forwarded, self.local_delivered, self.dropped, self.unroutable, self.multicast
        )
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpConfig {
    pub default_ttl: u8,
    pub default_multicast_ttl: u8,
    pub fragment_timeout: Duration,
    /// Minimum simulated time between two stale-fragment purges.
    pub fragment_check_interval: Duration,
    /// Relay datagrams not addressed to this host.
    pub forwarding: bool,
    pub protocol_mapping: String,
}

impl Default for IpConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            default_multicast_ttl: DEFAULT_MULTICAST_TTL,
            fragment_timeout: FRAGMENT_TIMEOUT,
            fragment_check_interval: FRAGMENT_CHECK_INTERVAL,
            forwarding: true,
            protocol_mapping: DEFAULT_PROTOCOL_MAPPING.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icmp_codes() {
        assert_eq!(ErrorSignal::TimeExceeded.icmp_type_code(), (11, 0));
        assert_eq!(ErrorSignal::NoRoute.icmp_type_code(), (3, 0));
        assert_eq!(ErrorSignal::ProtocolUnreachable.icmp_type_code(), (3, 2));
        assert_eq!(
            ErrorSignal::FragmentationNeeded { mtu: 576 }.icmp_type_code(),
            (3, 4)
        );
    }

    #[test]
    fn stats_display() {
        let stats = IpStats {
            forwarded: 3,
            dropped: 1,
            ..IpStats::default()
        };
        assert_eq!(
            stats.to_string(),
            "forwarded 3, delivered 0, dropped 1, unroutable 0, multicast 0"
        );
    }

    #[test]
    fn config_defaults() {
        let config = IpConfig::default();
        assert_eq!(config.default_ttl, 32);
        assert_eq!(config.default_multicast_ttl, 32);
        assert_eq!(config.fragment_timeout, Duration::from_secs(60));
        assert_eq!(config.fragment_check_interval, Duration::from_secs(10));
        assert!(config.forwarding);
    }
}
