//! Route table for datagram forwarding.

use std::net::Ipv4Addr;

use simnet_core::InterfaceId;

use super::types::{Route, RouteId};
use crate::error::RouteError;

/// Insertion-ordered route table.
///
/// Lookups scan every entry. Insertion order breaks ties, so repeated queries
/// against an unchanged table always return the same route.
#[must_use]
pub struct RoutingTable {
    entries: Vec<(RouteId, Route)>,
    next_id: u64,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Insert a route and return its handle.
    pub fn add(&mut self, route: Route) -> RouteId {
        let id = RouteId(self.next_id);
        self.next_id += 1;
        tracing::debug!(%id, %route, "route added");
        self.entries.push((id, route));
        id
    }

    /// Remove a route by handle.
    ///
    /// Removing a route the table does not hold is a caller bug and is
    /// reported as [`RouteError::UnknownRoute`].
    pub fn remove(&mut self, id: RouteId) -> Result<Route, RouteError> {
        let pos = self
            .entries
            .iter()
            .position(|(rid, _)| *rid == id)
            .ok_or(RouteError::UnknownRoute(id))?;
        let (_, route) = self.entries.remove(pos);
        tracing::debug!(%id, %route, "route removed");
        Ok(route)
    }

    #[must_use]
    pub fn get(&self, id: RouteId) -> Option<&Route> {
        self.entries
            .iter()
            .find(|(rid, _)| *rid == id)
            .map(|(_, r)| r)
    }

    pub fn get_mut(&mut self, id: RouteId) -> Option<&mut Route> {
        self.entries
            .iter_mut()
            .find(|(rid, _)| *rid == id)
            .map(|(_, r)| r)
    }

    #[must_use]
    pub fn contains(&self, id: RouteId) -> bool {
        self.get(id).is_some()
    }

    /// Most specific route whose network contains `addr`.
    ///
    /// Among equally specific routes the first inserted wins.
    #[must_use]
    pub fn longest_prefix_match(&self, addr: Ipv4Addr) -> Option<&Route> {
        let mut best: Option<&Route> = None;
        for (_, route) in &self.entries {
            if !route.destination.contains(addr) {
                continue;
            }
            if best.is_none_or(|b| route.destination.prefix_len() > b.destination.prefix_len()) {
                best = Some(route);
            }
        }
        best
    }

    /// First route whose destination address is exactly `addr`.
    #[must_use]
    pub fn exact_match(&self, addr: Ipv4Addr) -> Option<&Route> {
        self.entries
            .iter()
            .map(|(_, r)| r)
            .find(|r| r.destination.address() == addr)
    }

    /// Routes that carry traffic for the multicast group `group`.
    ///
    /// Only routes whose own destination is a multicast network qualify, so a
    /// unicast default route never fans multicast out.
    #[must_use]
    pub fn multicast_routes_for(&self, group: Ipv4Addr) -> Vec<&Route> {
        self.entries
            .iter()
            .map(|(_, r)| r)
            .filter(|r| r.destination.network().is_multicast() && r.destination.contains(group))
            .collect()
    }

    /// Remove every route using `interface`. Returns the number removed.
    pub fn remove_interface_routes(&mut self, interface: InterfaceId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, r)| r.interface != interface);
        before - self.entries.len()
    }

    /// Iterate over all routes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RouteId, &Route)> {
        self.entries.iter().map(|(id, r)| (*id, r))
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

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simnet_core::Ipv4Network;

    fn net(s: &str) -> Ipv4Network {
        s.parse().unwrap()
    }

    fn addr(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    const A: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
    const B: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 2);

    #[test]
    fn longest_prefix_wins() {
        let mut table = RoutingTable::new();
        table.add(Route::via(net("10.0.0.0/8"), A, InterfaceId(0)));
        table.add(Route::via(net("10.1.0.0/16"), B, InterfaceId(0)));

        let hit = table.longest_prefix_match(addr("10.1.2.3")).unwrap();
        assert_eq!(hit.gateway, Some(B));

        let hit = table.longest_prefix_match(addr("10.2.2.3")).unwrap();
        assert_eq!(hit.gateway, Some(A));

        assert!(table.longest_prefix_match(addr("192.168.0.1")).is_none());
    }

    #[test]
    fn insertion_order_does_not_affect_specificity() {
        let mut table = RoutingTable::new();
        table.add(Route::via(net("10.1.0.0/16"), B, InterfaceId(0)));
        table.add(Route::via(net("10.0.0.0/8"), A, InterfaceId(0)));
        let hit = table.longest_prefix_match(addr("10.1.2.3")).unwrap();
        assert_eq!(hit.gateway, Some(B));
    }

    #[test]
    fn equal_prefix_first_inserted_wins() {
        let mut table = RoutingTable::new();
        table.add(Route::via(net("10.0.0.0/8"), A, InterfaceId(0)));
        table.add(Route::via(net("10.0.0.0/8"), B, InterfaceId(1)));
        for _ in 0..3 {
            let hit = table.longest_prefix_match(addr("10.9.9.9")).unwrap();
            assert_eq!(hit.gateway, Some(A));
        }
    }

    #[test]
    fn default_route_matches_when_nothing_else_does() {
        let mut table = RoutingTable::new();
        table.add(Route::via(Ipv4Network::DEFAULT, A, InterfaceId(0)));
        table.add(Route::direct(net("10.0.0.0/24"), InterfaceId(1)));
        assert_eq!(
            table.longest_prefix_match(addr("8.8.8.8")).unwrap().gateway,
            Some(A)
        );
        assert_eq!(
            table.longest_prefix_match(addr("10.0.0.9")).unwrap().interface,
            InterfaceId(1)
        );
    }

    #[test]
    fn more_specific_route_changes_and_reverts_result() {
        let mut table = RoutingTable::new();
        table.add(Route::via(net("10.0.0.0/8"), A, InterfaceId(0)));
        let target = addr("10.1.2.3");
        assert_eq!(table.longest_prefix_match(target).unwrap().gateway, Some(A));

        let specific = table.add(Route::via(net("10.1.2.0/24"), B, InterfaceId(0)));
        assert_eq!(table.longest_prefix_match(target).unwrap().gateway, Some(B));

        table.remove(specific).unwrap();
        assert_eq!(table.longest_prefix_match(target).unwrap().gateway, Some(A));
    }

    #[test]
    fn remove_unknown_route_fails_loudly() {
        let mut table = RoutingTable::new();
        let id = table.add(Route::direct(net("10.0.0.0/8"), InterfaceId(0)));
        table.remove(id).unwrap();
        assert_eq!(table.remove(id), Err(RouteError::UnknownRoute(id)));
        assert_eq!(
            table.remove(RouteId(99)),
            Err(RouteError::UnknownRoute(RouteId(99)))
        );
    }

    #[test]
    fn exact_match_by_destination_address() {
        let mut table = RoutingTable::new();
        table.add(Route::via(net("10.0.0.0/8"), A, InterfaceId(0)));
        table.add(Route::via(net("10.0.0.5/32"), B, InterfaceId(0)));
        assert_eq!(table.exact_match(addr("10.0.0.5")).unwrap().gateway, Some(B));
        assert_eq!(table.exact_match(addr("10.0.0.0")).unwrap().gateway, Some(A));
        assert!(table.exact_match(addr("10.0.0.6")).is_none());
    }

    #[test]
    fn multicast_routes_ignore_unicast_default() {
        let mut table = RoutingTable::new();
        let group = addr("224.0.0.109");
        table.add(Route::via(Ipv4Network::DEFAULT, A, InterfaceId(0)));
        table.add(Route::direct(Ipv4Network::host(group), InterfaceId(1)));
        table.add(Route::direct(Ipv4Network::host(group), InterfaceId(2)));
        table.add(Route::direct(net("239.0.0.0/8"), InterfaceId(3)));

        let routes = table.multicast_routes_for(group);
        let ifaces: Vec<_> = routes.iter().map(|r| r.interface).collect();
        assert_eq!(ifaces, vec![InterfaceId(1), InterfaceId(2)]);
        assert_eq!(table.multicast_routes_for(addr("239.1.2.3")).len(), 1);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut table = RoutingTable::new();
        let id = table.add(Route::via(net("10.0.0.0/8"), A, InterfaceId(0)));
        table.get_mut(id).unwrap().gateway = Some(B);
        assert_eq!(table.get(id).unwrap().gateway, Some(B));
        assert!(table.contains(id));
    }

    #[test]
    fn remove_interface_routes_counts() {
        let mut table = RoutingTable::new();
        table.add(Route::direct(net("10.0.0.0/8"), InterfaceId(0)));
        table.add(Route::direct(net("10.1.0.0/16"), InterfaceId(1)));
        table.add(Route::direct(net("10.2.0.0/16"), InterfaceId(1)));
        assert_eq!(table.remove_interface_routes(InterfaceId(1)), 2);
        assert_eq!(table.len(), 1);
    }
}
