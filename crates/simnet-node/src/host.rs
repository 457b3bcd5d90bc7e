//! Host construction from configuration.
//!
//! Building a host wires the configured interfaces into an [`IpLayer`],
//! prepares the MANET interfaces when a `[manet]` section is present, then
//! installs connected and configured routes. Any configuration mistake is
//! fatal here and surfaces as a [`NodeError`].

use simnet_core::{InterfaceTable, Ipv4Network};
use simnet_ip::{IpLayer, IpStats, Route, RouteSource, RoutingTable};
use tracing::info;

use crate::config::{ManetSection, NodeConfig, parse_address};
use crate::error::NodeError;
use crate::manet::ManetRoutingTable;

/// A simulated host: one forwarding engine plus its optional MANET table.
pub struct Host {
    name: String,
    ip: IpLayer,
    manet: Option<ManetRoutingTable>,
}

impl Host {
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let ip_config = config.ip.to_ip_config()?;

        let mut interfaces = InterfaceTable::new();
        for iface in &config.interfaces {
            interfaces.add(iface.to_entry()?)?;
        }
        let mut ip = IpLayer::new(ip_config, interfaces)?;

        // runs before connected routes so MANET /32 interfaces derive none
        let manet = config
            .manet
            .as_ref()
            .map(|section| build_manet(section, &mut ip))
            .transpose()?;

        for route in plan_connected_routes(ip.interfaces())? {
            ip.routing_table_mut().add(route);
        }
        for route in &config.routes {
            let route = route.to_route(ip.interfaces())?;
            ip.routing_table_mut().add(route);
        }

        info!(
            host = %config.node.name,
            interfaces = ip.interfaces().len(),
            routes = ip.routing_table().len(),
            manet = manet.is_some(),
            forwarding = ip.config().forwarding,
            "host ready"
        );

        Ok(Self {
            name: config.node.name.clone(),
            ip,
            manet,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ip(&self) -> &IpLayer {
        &self.ip
    }

    pub fn ip_mut(&mut self) -> &mut IpLayer {
        &mut self.ip
    }

    pub fn manet(&self) -> Option<&ManetRoutingTable> {
        self.manet.as_ref()
    }

    /// The MANET table together with the route table it maintains.
    pub fn manet_mut(&mut self) -> Option<(&mut ManetRoutingTable, &mut RoutingTable)> {
        let manet = self.manet.as_mut()?;
        Some((manet, self.ip.routing_table_mut()))
    }

    /// Re-derive every MANET host route. A no-op without a MANET table.
    pub fn maintain_manet_routes(&mut self) -> Result<(), NodeError> {
        if let Some((manet, routes)) = self.manet_mut() {
            manet.maintain_associated_routing_table(routes)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> IpStats {
        self.ip.stats()
    }
}

fn build_manet(section: &ManetSection, ip: &mut IpLayer) -> Result<ManetRoutingTable, NodeError> {
    let address = parse_address(&section.address)?;
    let group = parse_address(&section.ll_manet_routers)?;
    if !group.is_multicast() {
        return Err(NodeError::Config(format!(
            "ll_manet_routers {group} is not a multicast group"
        )));
    }
    let (interfaces, routes) = ip.tables_mut();
    Ok(ManetRoutingTable::new(
        address,
        &section.interfaces,
        group,
        interfaces,
        routes,
    )?)
}

/// Direct routes for the networks the host's interfaces sit on.
///
/// Loopback and /32 interfaces contribute none.
pub fn plan_connected_routes(interfaces: &InterfaceTable) -> Result<Vec<Route>, NodeError> {
    interfaces
        .iter()
        .filter(|iface| !iface.loopback && iface.prefix_len < 32)
        .map(|iface| {
            let net = iface.network();
            let destination = Ipv4Network::new(net.network(), net.prefix_len())
                .map_err(|e| NodeError::Config(format!("interface {}: {e}", iface.name)))?;
            Ok(Route::direct(destination, iface.id()).with_source(RouteSource::InterfaceConfig))
        })
        .collect()
}
