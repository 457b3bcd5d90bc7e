//! MANET route-maintenance table.
//!
//! A reactive MANET routing protocol keeps its own list of logical routes
//! (with hop distance, sequence number and a broken flag) and materializes
//! the usable ones as /32 host routes in the host's [`RoutingTable`]. This
//! module owns that list and the link between each logical route and the
//! route-table entry derived from it.

use core::fmt;
use std::net::Ipv4Addr;

use simnet_core::address::{ALL_HOSTS_MCAST, ALL_ROUTERS_MCAST};
use simnet_core::{InterfaceId, InterfaceTable, Ipv4Network};
use simnet_ip::{Route, RouteId, RouteKind, RouteSource, RoutingTable};
use tracing::debug;

use crate::error::ManetError;

/// Handle for a logical route, assigned by [`ManetRoutingTable::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManetEntryId(pub u64);

impl fmt::Display for ManetEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manet#{}", self.0)
    }
}

/// One logical route known to the MANET protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManetRoute {
    id: ManetEntryId,
    pub address: Ipv4Addr,
    pub prefix_len: u8,
    pub sequence_number: u32,
    pub next_hop: Ipv4Addr,
    pub interface: InterfaceId,
    /// Hop count to `address`.
    pub distance: u32,
    pub broken: bool,
    route: Option<RouteId>,
}

impl ManetRoute {
    pub fn new(address: Ipv4Addr, next_hop: Ipv4Addr, interface: InterfaceId, distance: u32) -> Self {
        Self {
            id: ManetEntryId(0),
            address,
            prefix_len: 32,
            sequence_number: 0,
            next_hop,
            interface,
            distance,
            broken: false,
            route: None,
        }
    }

    #[must_use]
    pub fn with_prefix_len(mut self, prefix_len: u8) -> Self {
        self.prefix_len = prefix_len.min(32);
        self
    }

    #[must_use]
    pub fn with_sequence_number(mut self, sequence_number: u32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    pub fn id(&self) -> ManetEntryId {
        self.id
    }

    /// The route-table entry currently derived from this route, if any.
    pub fn route_id(&self) -> Option<RouteId> {
        self.route
    }

    fn covers(&self, addr: Ipv4Addr) -> bool {
        Ipv4Network::new(self.address, self.prefix_len).is_ok_and(|net| net.contains(addr))
    }

    fn to_route(&self) -> Route {
        let kind = if self.distance > 1 {
            RouteKind::Remote
        } else {
            RouteKind::Direct
        };
        Route {
            destination: Ipv4Network::host(self.address),
            gateway: Some(self.next_hop),
            interface: self.interface,
            kind,
            source: RouteSource::Manet,
            metric: 1,
        }
    }
}

impl fmt::Display for ManetRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} via {} dev {} dist {} seq {}",
            self.address,
            self.prefix_len,
            self.next_hop,
            self.interface,
            self.distance,
            self.sequence_number
        )?;
        if self.broken {
            write!(f, " broken")?;
        }
        Ok(())
    }
}

/// Ordered list of logical MANET routes bound to a host's route table.
#[derive(Debug)]
pub struct ManetRoutingTable {
    host_address: Ipv4Addr,
    entries: Vec<ManetRoute>,
    next_id: u64,
}

impl ManetRoutingTable {
    /// Prepare the named interfaces for MANET operation.
    ///
    /// Every non-loopback interface gets `host_address` with a /32 netmask,
    /// joins the all-hosts, all-routers and `ll_manet_routers` groups and
    /// enables broadcast. Every named interface gets a direct route for the
    /// `ll_manet_routers` group. Nothing is changed if a name is unknown.
    pub fn new<S: AsRef<str>>(
        host_address: Ipv4Addr,
        interface_names: &[S],
        ll_manet_routers: Ipv4Addr,
        interfaces: &mut InterfaceTable,
        routes: &mut RoutingTable,
    ) -> Result<Self, ManetError> {
        let ids = interface_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                interfaces
                    .id_of(name)
                    .map_err(|_| ManetError::UnknownInterface(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for id in ids {
            let Some(iface) = interfaces.get_mut(id) else {
                continue;
            };
            if !iface.loopback {
                // all-ones netmask keeps connected routes from being derived
                iface.address = host_address;
                iface.prefix_len = 32;
                for group in [ALL_HOSTS_MCAST, ALL_ROUTERS_MCAST, ll_manet_routers] {
                    iface.join_group(group);
                }
                iface.broadcast = true;
            }
            debug!(interface = %iface.name, %host_address, "interface configured for manet");

            routes.add(
                Route::direct(Ipv4Network::host(ll_manet_routers), id)
                    .with_source(RouteSource::Manet)
                    .with_metric(1),
            );
        }

        Ok(Self {
            host_address,
            entries: Vec::new(),
            next_id: 0,
        })
    }

    pub fn host_address(&self) -> Ipv4Addr {
        self.host_address
    }

    /// Append a logical route. It is not materialized until maintained.
    pub fn add(&mut self, mut entry: ManetRoute) -> ManetEntryId {
        let id = ManetEntryId(self.next_id);
        self.next_id += 1;
        entry.id = id;
        entry.route = None;
        debug!(%id, route = %entry, "manet route added");
        self.entries.push(entry);
        id
    }

    /// Remove a logical route and its derived route-table entry.
    pub fn delete(
        &mut self,
        id: ManetEntryId,
        routes: &mut RoutingTable,
    ) -> Result<ManetRoute, ManetError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(ManetError::UnknownEntry(id))?;
        let mut entry = self.entries.remove(pos);
        release(&mut entry, routes)?;
        debug!(%id, route = %entry, "manet route deleted");
        Ok(entry)
    }

    /// The `k`-th logical route, in insertion order.
    #[must_use]
    pub fn get(&self, k: usize) -> Option<&ManetRoute> {
        self.entries.get(k)
    }

    #[must_use]
    pub fn get_mut(&mut self, k: usize) -> Option<&mut ManetRoute> {
        self.entries.get_mut(k)
    }

    #[must_use]
    pub fn find(&self, id: ManetEntryId) -> Option<&ManetRoute> {
        self.entries.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn find_mut(&mut self, id: ManetEntryId) -> Option<&mut ManetRoute> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Route whose address is exactly `addr`.
    #[must_use]
    pub fn get_by_address(&self, addr: Ipv4Addr) -> Option<&ManetRoute> {
        self.entries.iter().find(|e| e.address == addr)
    }

    /// Most specific route covering `addr`. The earliest entry wins a tie.
    #[must_use]
    pub fn get_for_address(&self, addr: Ipv4Addr) -> Option<&ManetRoute> {
        let mut best: Option<&ManetRoute> = None;
        for entry in self.entries.iter().filter(|e| e.covers(addr)) {
            if best.is_none_or(|b| entry.prefix_len > b.prefix_len) {
                best = Some(entry);
            }
        }
        best
    }

    /// Bring the derived route of one logical route in line with it.
    ///
    /// A usable route is created or updated in place as a /32 host route;
    /// a broken one loses its derived route.
    pub fn maintain_associated_entry_for(
        &mut self,
        id: ManetEntryId,
        routes: &mut RoutingTable,
    ) -> Result<(), ManetError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(ManetError::UnknownEntry(id))?;
        maintain(entry, routes)
    }

    /// Maintain the derived route of every logical route.
    pub fn maintain_associated_routing_table(
        &mut self,
        routes: &mut RoutingTable,
    ) -> Result<(), ManetError> {
        for entry in &mut self.entries {
            maintain(entry, routes)?;
        }
        Ok(())
    }

    /// Delete every logical route. Returns how many were removed.
    pub fn clear(&mut self, routes: &mut RoutingTable) -> Result<usize, ManetError> {
        let count = self.entries.len();
        for mut entry in self.entries.drain(..) {
            release(&mut entry, routes)?;
        }
        Ok(count)
    }

    /// One-line summary: `"N entries (B broken)"`.
    pub fn info(&self) -> String {
        let broken = self.entries.iter().filter(|e| e.broken).count();
        format!("{} entries ({broken} broken)", self.entries.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManetRoute> {
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

impl fmt::Display for ManetRoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info())?;
        for entry in &self.entries {
            write!(f, "\n  {entry}")?;
        }
        Ok(())
    }
}

fn maintain(entry: &mut ManetRoute, routes: &mut RoutingTable) -> Result<(), ManetError> {
    if entry.broken {
        return release(entry, routes);
    }

    let derived = entry.to_route();
    if let Some(route_id) = entry.route
        && let Some(existing) = routes.get_mut(route_id)
    {
        *existing = derived;
        return Ok(());
    }
    let route_id = routes.add(derived);
    debug!(id = %entry.id, %route_id, route = %entry, "manet route materialized");
    entry.route = Some(route_id);
    Ok(())
}

/// Drop the derived route, if it is still in the table.
fn release(entry: &mut ManetRoute, routes: &mut RoutingTable) -> Result<(), ManetError> {
    if let Some(route_id) = entry.route.take()
        && routes.contains(route_id)
    {
        routes.remove(route_id)?;
        debug!(id = %entry.id, %route_id, "manet route withdrawn");
    }
    Ok(())
}
