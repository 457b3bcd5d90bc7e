//! Timed-event replay against a configured host.
//!
//! A scenario is a TOML list of `[[events]]`, each stamped with a simulated
//! time in milliseconds. Events are applied in time order (file order breaks
//! ties) and every action the forwarding engine returns is logged.
//!
//! ```toml
//! [[events]]
//! at_ms = 0
//! kind = "receive"
//! interface = "eth0"
//! source = "10.0.0.9"
//! destination = "192.168.4.4"
//! payload = "hello"
//!
//! [[events]]
//! at_ms = 15000
//! kind = "purge"
//! ```

use std::net::Ipv4Addr;
use std::path::Path;

use serde::Deserialize;

use simnet_core::{Datagram, InterfaceId, ProtocolId, SimTime};
use simnet_ip::{IpAction, SendRequest};
use tracing::{debug, info};

use crate::error::NodeError;
use crate::host::Host;
use crate::manet::ManetRoute;

/// A parsed scenario file.
#[derive(Debug, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

impl Scenario {
    /// Load a scenario from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Scenario(format!("failed to read scenario file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse a scenario from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s)
            .map_err(|e| NodeError::Scenario(format!("failed to parse scenario: {e}")))
    }
}

/// One `[[events]]` entry.
#[derive(Debug, Deserialize)]
pub struct ScenarioEvent {
    /// Simulated time of the event, in milliseconds.
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: EventAction,
}

/// What happens at an event's time, selected by its `kind` key.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventAction {
    /// A datagram arrives from the network.
    Receive {
        interface: String,
        source: String,
        destination: String,
        #[serde(default = "default_protocol")]
        protocol: u8,
        #[serde(default = "default_receive_ttl")]
        ttl: u8,
        #[serde(default)]
        identification: u16,
        /// In bytes; must be a multiple of 8.
        #[serde(default)]
        fragment_offset: u16,
        #[serde(default)]
        more_fragments: bool,
        #[serde(default)]
        dont_fragment: bool,
        #[serde(default)]
        payload: String,
        payload_len: Option<usize>,
    },
    /// An upper layer asks the host to send.
    Send {
        destination: String,
        source: Option<String>,
        #[serde(default = "default_protocol")]
        protocol: u8,
        ttl: Option<u8>,
        #[serde(default)]
        dont_fragment: bool,
        interface: Option<String>,
        #[serde(default)]
        payload: String,
        payload_len: Option<usize>,
    },
    /// Force a stale-fragment purge.
    Purge,
    /// The MANET protocol learns, updates or breaks a route.
    ManetRoute {
        address: String,
        next_hop: String,
        interface: String,
        #[serde(default = "default_distance")]
        distance: u32,
        #[serde(default)]
        broken: bool,
    },
}

fn default_protocol() -> u8 {
    ProtocolId::UDP.0
}

fn default_receive_ttl() -> u8 {
    32
}

fn default_distance() -> u32 {
    1
}

/// Tally of a replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub events: usize,
    pub transmitted: usize,
    pub delivered: usize,
    pub signalled: usize,
    pub queued: usize,
    pub purged: usize,
}

impl ScenarioReport {
    fn record(&mut self, action: &IpAction) {
        match action {
            IpAction::Transmit { .. } => self.transmitted += 1,
            IpAction::DeliverLocal { .. } => self.delivered += 1,
            IpAction::SignalError { .. } => self.signalled += 1,
            IpAction::Queued { .. } => self.queued += 1,
        }
    }
}

/// Replay `scenario` against `host` and return what happened.
pub fn run(host: &mut Host, scenario: &Scenario) -> Result<ScenarioReport, NodeError> {
    let mut events: Vec<&ScenarioEvent> = scenario.events.iter().collect();
    events.sort_by_key(|e| e.at_ms);

    let mut report = ScenarioReport::default();
    for event in events {
        let now = SimTime::from_millis(event.at_ms);
        let actions = apply(host, &event.action, now, &mut report)?;
        for action in &actions {
            log_action(now, action);
            report.record(action);
        }
        report.events += 1;
    }

    info!(
        host = host.name(),
        events = report.events,
        transmitted = report.transmitted,
        delivered = report.delivered,
        signalled = report.signalled,
        "scenario complete"
    );
    Ok(report)
}

fn apply(
    host: &mut Host,
    action: &EventAction,
    now: SimTime,
    report: &mut ScenarioReport,
) -> Result<Vec<IpAction>, NodeError> {
    match action {
        EventAction::Receive {
            interface,
            source,
            destination,
            protocol,
            ttl,
            identification,
            fragment_offset,
            more_fragments,
            dont_fragment,
            payload,
            payload_len,
        } => {
            let in_iface = interface_id(host, interface)?;
            let mut datagram = Datagram::new(
                event_address(source)?,
                event_address(destination)?,
                ProtocolId(*protocol),
                *ttl,
                payload_bytes(payload, *payload_len),
            )
            .with_identification(*identification)
            .with_dont_fragment(*dont_fragment);
            datagram.fragment_offset = *fragment_offset;
            datagram.more_fragments = *more_fragments;
            debug!(at = %now, %interface, %datagram, "datagram arrives");
            Ok(host.ip_mut().handle_from_network(datagram, in_iface, now)?)
        }
        EventAction::Send {
            destination,
            source,
            protocol,
            ttl,
            dont_fragment,
            interface,
            payload,
            payload_len,
        } => {
            let mut request = SendRequest::new(
                event_address(destination)?,
                ProtocolId(*protocol),
                payload_bytes(payload, *payload_len),
            )
            .with_dont_fragment(*dont_fragment);
            if let Some(source) = source {
                request = request.with_source(event_address(source)?);
            }
            if let Some(ttl) = ttl {
                request = request.with_ttl(*ttl);
            }
            if let Some(name) = interface {
                request = request.with_interface(interface_id(host, name)?);
            }
            debug!(at = %now, destination = %request.destination, "upper layer sends");
            Ok(host.ip_mut().handle_from_above(request, now)?)
        }
        EventAction::Purge => {
            let purged = host.ip_mut().purge_expired_fragments(now);
            info!(at = %now, purged, "stale fragments purged");
            report.purged += purged;
            Ok(Vec::new())
        }
        EventAction::ManetRoute {
            address,
            next_hop,
            interface,
            distance,
            broken,
        } => {
            let address = event_address(address)?;
            let next_hop = event_address(next_hop)?;
            let interface = interface_id(host, interface)?;
            let (manet, routes) = host
                .manet_mut()
                .ok_or_else(|| NodeError::Scenario("host has no [manet] section".into()))?;

            let id = match manet.get_by_address(address).map(ManetRoute::id) {
                Some(id) => {
                    if let Some(entry) = manet.find_mut(id) {
                        entry.next_hop = next_hop;
                        entry.interface = interface;
                        entry.distance = *distance;
                        entry.broken = *broken;
                    }
                    id
                }
                None => {
                    let mut entry = ManetRoute::new(address, next_hop, interface, *distance);
                    entry.broken = *broken;
                    manet.add(entry)
                }
            };
            manet.maintain_associated_entry_for(id, routes)?;
            info!(at = %now, %address, %next_hop, distance, broken, table = %manet.info(), "manet route maintained");
            Ok(Vec::new())
        }
    }
}

fn log_action(now: SimTime, action: &IpAction) {
    match action {
        IpAction::Transmit {
            interface,
            next_hop,
            datagram,
        } => info!(at = %now, %interface, ?next_hop, %datagram, "transmit"),
        IpAction::DeliverLocal { gate, packet } => info!(
            at = %now,
            gate,
            source = %packet.source,
            protocol = %packet.protocol,
            len = packet.payload.len(),
            "deliver"
        ),
        IpAction::SignalError { signal, datagram } => {
            let (icmp_type, icmp_code) = signal.icmp_type_code();
            info!(at = %now, ?signal, icmp_type, icmp_code, %datagram, "error signal");
        }
        IpAction::Queued { handle, point } => info!(at = %now, %handle, ?point, "queued"),
    }
}

fn interface_id(host: &Host, name: &str) -> Result<InterfaceId, NodeError> {
    host.ip()
        .interfaces()
        .id_of(name)
        .map_err(|_| NodeError::Scenario(format!("no such interface: {name}")))
}

fn event_address(s: &str) -> Result<Ipv4Addr, NodeError> {
    s.trim()
        .parse()
        .map_err(|e| NodeError::Scenario(format!("invalid address '{s}': {e}")))
}

/// `text` as bytes, repeated or cut to `len` when given.
fn payload_bytes(text: &str, len: Option<usize>) -> Vec<u8> {
    match len {
        Some(len) if text.is_empty() => vec![0; len],
        Some(len) => text.bytes().cycle().take(len).collect(),
        None => text.as_bytes().to_vec(),
    }
}
