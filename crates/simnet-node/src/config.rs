//! TOML-based configuration for simnet hosts.

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use simnet_core::constants::{DEFAULT_MULTICAST_TTL, DEFAULT_TTL};
use simnet_core::{InterfaceEntry, InterfaceTable, Ipv4Network};
use simnet_ip::constants::DEFAULT_PROTOCOL_MAPPING;
use simnet_ip::{IpConfig, ProtocolMap, Route, RouteKind, RouteSource};

use crate::error::NodeError;

/// Top-level host configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub ip: IpSection,
    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    pub manet: Option<ManetSection>,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }
}

/// The `[node]` section.
#[derive(Debug, Deserialize)]
pub struct NodeSection {
    #[serde(default = "default_node_name")]
    pub name: String,
}

fn default_node_name() -> String {
    "host".to_string()
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            name: default_node_name(),
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The `[ip]` section.
#[derive(Debug, Deserialize)]
pub struct IpSection {
    #[serde(default = "default_ttl")]
    pub default_ttl: u8,
    #[serde(default = "default_multicast_ttl")]
    pub default_multicast_ttl: u8,
    #[serde(default = "default_fragment_timeout_ms")]
    pub fragment_timeout_ms: u64,
    #[serde(default = "default_fragment_check_interval_ms")]
    pub fragment_check_interval_ms: u64,
    #[serde(default = "default_forwarding")]
    pub forwarding: bool,
    #[serde(default = "default_protocol_mapping")]
    pub protocol_mapping: String,
}

fn default_ttl() -> u8 {
    DEFAULT_TTL
}

fn default_multicast_ttl() -> u8 {
    DEFAULT_MULTICAST_TTL
}

fn default_fragment_timeout_ms() -> u64 {
    60_000
}

fn default_fragment_check_interval_ms() -> u64 {
    10_000
}

fn default_forwarding() -> bool {
    true
}

fn default_protocol_mapping() -> String {
    DEFAULT_PROTOCOL_MAPPING.to_string()
}

impl Default for IpSection {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            default_multicast_ttl: default_multicast_ttl(),
            fragment_timeout_ms: default_fragment_timeout_ms(),
            fragment_check_interval_ms: default_fragment_check_interval_ms(),
            forwarding: default_forwarding(),
            protocol_mapping: default_protocol_mapping(),
        }
    }
}

impl IpSection {
    /// Convert to the pipeline's settings, validating the protocol mapping.
    pub fn to_ip_config(&self) -> Result<IpConfig, NodeError> {
        self.protocol_mapping
            .parse::<ProtocolMap>()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        if self.fragment_timeout_ms == 0 {
            return Err(NodeError::Config(
                "fragment_timeout_ms must be positive".into(),
            ));
        }
        Ok(IpConfig {
            default_ttl: self.default_ttl,
            default_multicast_ttl: self.default_multicast_ttl,
            fragment_timeout: Duration::from_millis(self.fragment_timeout_ms),
            fragment_check_interval: Duration::from_millis(self.fragment_check_interval_ms),
            forwarding: self.forwarding,
            protocol_mapping: self.protocol_mapping.clone(),
        })
    }
}

/// An `[[interfaces]]` entry.
#[derive(Debug, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    /// Required unless `loopback` is set.
    pub address: Option<String>,
    #[serde(default = "default_prefix_len")]
    pub prefix_len: u8,
    pub mtu: Option<usize>,
    #[serde(default)]
    pub broadcast: bool,
    #[serde(default)]
    pub loopback: bool,
    #[serde(default)]
    pub multicast_groups: Vec<String>,
}

fn default_prefix_len() -> u8 {
    24
}

impl InterfaceConfig {
    pub fn to_entry(&self) -> Result<InterfaceEntry, NodeError> {
        let mut entry = if self.loopback {
            InterfaceEntry::loopback(&self.name)
        } else {
            let address = self.address.as_deref().ok_or_else(|| {
                NodeError::Config(format!("interface {} has no address", self.name))
            })?;
            if self.prefix_len > 32 {
                return Err(NodeError::Config(format!(
                    "interface {}: invalid prefix length {}",
                    self.name, self.prefix_len
                )));
            }
            InterfaceEntry::new(&self.name, parse_address(address)?, self.prefix_len)
                .with_broadcast(self.broadcast)
        };
        if let Some(mtu) = self.mtu {
            entry = entry.with_mtu(mtu);
        }
        for group in &self.multicast_groups {
            let group = parse_address(group)?;
            if !group.is_multicast() {
                return Err(NodeError::Config(format!(
                    "interface {}: {group} is not a multicast group",
                    self.name
                )));
            }
            entry.join_group(group);
        }
        Ok(entry)
    }
}

/// A `[[routes]]` entry.
#[derive(Debug, Deserialize)]
pub struct RouteConfig {
    /// Destination network in CIDR form, e.g. `"10.1.0.0/16"`.
    pub destination: String,
    pub gateway: Option<String>,
    /// Egress interface, by name.
    pub interface: String,
    /// `"direct"` or `"remote"`; inferred from `gateway` when omitted.
    pub kind: Option<String>,
    pub metric: Option<u32>,
}

impl RouteConfig {
    /// Resolve against the host's interfaces.
    pub fn to_route(&self, interfaces: &InterfaceTable) -> Result<Route, NodeError> {
        let destination = parse_network(&self.destination)?;
        let interface = interfaces.id_of(&self.interface).map_err(|_| {
            NodeError::Config(format!(
                "route {}: no such interface {}",
                self.destination, self.interface
            ))
        })?;
        let gateway = self.gateway.as_deref().map(parse_address).transpose()?;

        let mut route = match gateway {
            Some(gw) => Route::via(destination, gw, interface),
            None => Route::direct(destination, interface),
        };
        if let Some(kind) = self.kind.as_deref() {
            route.kind = parse_route_kind(kind)?;
        }
        if route.kind == RouteKind::Remote && route.gateway.is_none() {
            return Err(NodeError::Config(format!(
                "route {}: remote route needs a gateway",
                self.destination
            )));
        }
        if let Some(metric) = self.metric {
            route.metric = metric;
        }
        Ok(route.with_source(RouteSource::Manual))
    }
}

/// The optional `[manet]` section.
#[derive(Debug, Deserialize)]
pub struct ManetSection {
    /// Host address assigned to every MANET interface.
    pub address: String,
    /// Interfaces taking part in the MANET, by name.
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default = "default_ll_manet_routers")]
    pub ll_manet_routers: String,
}

fn default_ll_manet_routers() -> String {
    "224.0.0.109".to_string()
}

/// Parse a dotted-quad address like "10.0.0.1".
pub fn parse_address(s: &str) -> Result<Ipv4Addr, NodeError> {
    s.trim()
        .parse()
        .map_err(|e| NodeError::Config(format!("invalid address '{s}': {e}")))
}

/// Parse a CIDR network like "10.0.0.0/8".
pub fn parse_network(s: &str) -> Result<Ipv4Network, NodeError> {
    s.trim()
        .parse()
        .map_err(|e| NodeError::Config(format!("invalid network '{s}': {e}")))
}

/// Parse a route kind string to a `RouteKind`.
pub fn parse_route_kind(s: &str) -> Result<RouteKind, NodeError> {
    match s.to_lowercase().as_str() {
        "direct" => Ok(RouteKind::Direct),
        "remote" => Ok(RouteKind::Remote),
        other => Err(NodeError::Config(format!("unknown route kind: {other}"))),
    }
}
