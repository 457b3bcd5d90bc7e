//! Route types.

use core::fmt;
use std::net::Ipv4Addr;

use simnet_core::{InterfaceId, Ipv4Network};

/// Stable handle for a route, assigned by [`RoutingTable::add`](super::RoutingTable::add).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub u64);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route#{}", self.0)
    }
}

/// Whether the destination is on-link or reached through a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Direct,
    Remote,
}

/// Who installed the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Manual,
    InterfaceConfig,
    Manet,
}

/// A single entry in the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub destination: Ipv4Network,
    /// Next hop; `None` when the destination is directly connected.
    pub gateway: Option<Ipv4Addr>,
    pub interface: InterfaceId,
    pub kind: RouteKind,
    pub source: RouteSource,
    pub metric: u32,
}

impl Route {
    /// A directly connected network reached through `interface`.
    pub fn direct(destination: Ipv4Network, interface: InterfaceId) -> Self {
        Self {
            destination,
            gateway: None,
            interface,
            kind: RouteKind::Direct,
            source: RouteSource::Manual,
            metric: 0,
        }
    }

    /// A remote network reached through `gateway` on `interface`.
    pub fn via(destination: Ipv4Network, gateway: Ipv4Addr, interface: InterfaceId) -> Self {
        Self {
            destination,
            gateway: Some(gateway),
            interface,
            kind: RouteKind::Remote,
            source: RouteSource::Manual,
            metric: 1,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: RouteSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: u32) -> Self {
        self.metric = metric;
        self
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.destination)?;
        match self.gateway {
            Some(gw) => write!(f, "via {gw} ")?,
            None => write!(f, "direct ")?,
        }
        write!(f, "dev {} metric {}", self.interface, self.metric)
    }
}
