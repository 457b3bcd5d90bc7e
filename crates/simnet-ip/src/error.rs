//! Forwarding engine error types.
//!
//! These cover caller and configuration mistakes. Datagrams lost to routing,
//! TTL or fragmentation conditions are not errors: they are counted in
//! [`IpStats`](crate::pipeline::IpStats) and reported through
//! [`IpAction::SignalError`](crate::pipeline::IpAction::SignalError).

use simnet_core::{InterfaceId, ProtocolId};

use crate::hook::{HookPoint, QueueHandle, Verdict};
use crate::route::RouteId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown routing entry requested to be deleted: {0}")]
    UnknownRoute(RouteId),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FragmentError {
    #[error("fragment ends at {end}, beyond the maximum datagram size")]
    TooLarge { end: usize },

    #[error("fragment [{start}, {end}) lies past the end of the datagram ({total})")]
    OutOfBounds { start: usize, end: usize, total: usize },

    #[error("non-final fragment length {0} is not a multiple of 8")]
    Misaligned(usize),

    #[error("mtu {mtu} cannot carry a {header_len}-byte header plus data")]
    MtuTooSmall { mtu: usize, header_len: usize },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IpError {
    #[error("unknown interface: {0}")]
    UnknownInterface(InterfaceId),

    #[error("no interface with source address {0}")]
    NoInterfaceForSource(std::net::Ipv4Addr),

    #[error("no queued datagram for handle {0}")]
    UnknownQueueHandle(QueueHandle),

    #[error("invalid re-injection verdict {verdict:?} for datagram queued at {point:?}")]
    InvalidReinjectVerdict { verdict: Verdict, point: HookPoint },

    #[error("invalid protocol mapping '{0}'")]
    InvalidProtocolMapping(String),

    #[error("protocol {0} is mapped twice")]
    DuplicateProtocol(ProtocolId),

    #[error("route error: {0}")]
    Route(#[from] RouteError),
}
