//! The datagram pipeline.

use std::net::Ipv4Addr;
use std::rc::Rc;

use simnet_core::address::is_link_local_multicast;
use simnet_core::{Datagram, InterfaceId, InterfaceTable, SimTime};

use super::types::{DeliveredPacket, ErrorSignal, IpAction, IpConfig, IpStats, SendRequest};
use crate::error::IpError;
use crate::fragment::{Reassembly, ReassemblyBuffer, fragment};
use crate::hook::{
    ChainOutcome, Hook, HookChain, HookContext, HookKey, HookPoint, HookQueue, QueueHandle,
    QueuedDatagram, Verdict,
};
use crate::protocol_map::ProtocolMap;
use crate::route::RoutingTable;

/// Where a datagram came from and where it is going, as far as known.
#[derive(Debug, Clone, Copy, Default)]
struct Flow {
    in_iface: Option<InterfaceId>,
    out_iface: Option<InterfaceId>,
    next_hop: Option<Ipv4Addr>,
}

/// Network-layer forwarding engine for one host.
///
/// Holds the interface and route tables, the hook chain, queued datagrams
/// and the reassembly buffer. Each entry point processes one datagram to
/// completion, or until a hook queues it, and returns the resulting actions.
/// The engine performs no I/O and never reads the wall clock.
pub struct IpLayer {
    config: IpConfig,
    interfaces: InterfaceTable,
    routes: RoutingTable,
    hooks: HookChain,
    queue: HookQueue,
    fragments: ReassemblyBuffer,
    protocols: ProtocolMap,
    stats: IpStats,
    next_identification: u16,
    last_fragment_check: SimTime,
}

impl IpLayer {
    /// Build a pipeline over `interfaces`.
    ///
    /// Fails if the configured protocol mapping does not parse.
    pub fn new(config: IpConfig, interfaces: InterfaceTable) -> Result<Self, IpError> {
        let protocols: ProtocolMap = config.protocol_mapping.parse()?;
        let fragments = ReassemblyBuffer::new(config.fragment_timeout);
        Ok(Self {
            config,
            interfaces,
            routes: RoutingTable::new(),
            hooks: HookChain::new(),
            queue: HookQueue::new(),
            fragments,
            protocols,
            stats: IpStats::default(),
            next_identification: 0,
            last_fragment_check: SimTime::ZERO,
        })
    }

    pub fn config(&self) -> &IpConfig {
        &self.config
    }

    pub fn interfaces(&self) -> &InterfaceTable {
        &self.interfaces
    }

    pub fn interfaces_mut(&mut self) -> &mut InterfaceTable {
        &mut self.interfaces
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn routing_table_mut(&mut self) -> &mut RoutingTable {
        &mut self.routes
    }

    /// Both host tables at once, for collaborators that maintain routes
    /// alongside interface settings.
    pub fn tables_mut(&mut self) -> (&mut InterfaceTable, &mut RoutingTable) {
        (&mut self.interfaces, &mut self.routes)
    }

    pub fn protocol_map(&self) -> &ProtocolMap {
        &self.protocols
    }

    pub fn reassembly_buffer(&self) -> &ReassemblyBuffer {
        &self.fragments
    }

    pub fn queued(&self) -> &HookQueue {
        &self.queue
    }

    pub fn stats(&self) -> IpStats {
        self.stats
    }

    /// Add `hook` to the chain. Lower priorities run first.
    pub fn register_hook(&mut self, priority: i32, hook: Rc<dyn Hook>) -> HookKey {
        self.hooks.register(priority, hook)
    }

    /// Remove `hook` from the chain. Unknown hooks are ignored.
    pub fn unregister_hook(&mut self, priority: i32, hook: &Rc<dyn Hook>) -> bool {
        self.hooks.unregister(priority, hook)
    }

    /// Process a datagram received on `in_iface`.
    pub fn handle_from_network(
        &mut self,
        mut datagram: Datagram,
        in_iface: InterfaceId,
        now: SimTime,
    ) -> Result<Vec<IpAction>, IpError> {
        if self.interfaces.get(in_iface).is_none() {
            return Err(IpError::UnknownInterface(in_iface));
        }
        let mut actions = Vec::new();

        if datagram.ttl == 0 {
            tracing::debug!(%datagram, %in_iface, "ttl exhausted on arrival");
            self.stats.dropped += 1;
            signal(&mut actions, ErrorSignal::TimeExceeded, datagram);
            return Ok(actions);
        }
        datagram.ttl -= 1;

        let flow = Flow {
            in_iface: Some(in_iface),
            ..Flow::default()
        };
        self.run_stage(HookPoint::PreRouting, datagram, flow, None, now, &mut actions);
        Ok(actions)
    }

    /// Encapsulate an upper-layer payload and send it.
    pub fn handle_from_above(
        &mut self,
        request: SendRequest,
        now: SimTime,
    ) -> Result<Vec<IpAction>, IpError> {
        if let Some(source) = request.source
            && !source.is_unspecified()
            && self.interfaces.by_address(source).is_none()
        {
            return Err(IpError::NoInterfaceForSource(source));
        }
        if let Some(id) = request.interface
            && self.interfaces.get(id).is_none()
        {
            return Err(IpError::UnknownInterface(id));
        }

        let ttl = request.ttl.unwrap_or(if request.destination.is_multicast() {
            self.config.default_multicast_ttl
        } else {
            self.config.default_ttl
        });
        let identification = self.next_identification;
        self.next_identification = self.next_identification.wrapping_add(1);

        let datagram = Datagram::new(
            request.source.unwrap_or(Ipv4Addr::UNSPECIFIED),
            request.destination,
            request.protocol,
            ttl,
            request.payload,
        )
        .with_identification(identification)
        .with_dont_fragment(request.dont_fragment)
        .with_options(request.options);

        let flow = Flow {
            out_iface: request.interface,
            ..Flow::default()
        };
        let mut actions = Vec::new();
        self.run_stage(HookPoint::LocalOut, datagram, flow, None, now, &mut actions);
        Ok(actions)
    }

    /// Resume or discard a datagram a hook queued.
    ///
    /// ACCEPT continues with the hooks after the one that queued it, then
    /// with the rest of the pipeline. DROP discards it. Re-injecting with
    /// QUEUE, or with a handle that is not queued, is an error; the queued
    /// entry is left untouched in that case.
    pub fn reinject(
        &mut self,
        handle: QueueHandle,
        verdict: Verdict,
        now: SimTime,
    ) -> Result<Vec<IpAction>, IpError> {
        let mut actions = Vec::new();
        match verdict {
            Verdict::Queue => {
                let point = self
                    .queue
                    .get(handle)
                    .map(|e| e.point)
                    .ok_or(IpError::UnknownQueueHandle(handle))?;
                return Err(IpError::InvalidReinjectVerdict { verdict, point });
            }
            Verdict::Drop => {
                let entry = self
                    .queue
                    .take(handle)
                    .ok_or(IpError::UnknownQueueHandle(handle))?;
                tracing::debug!(%handle, datagram = %entry.datagram, "queued datagram dropped");
                self.stats.dropped += 1;
            }
            Verdict::Accept => {
                let entry = self
                    .queue
                    .take(handle)
                    .ok_or(IpError::UnknownQueueHandle(handle))?;
                tracing::debug!(%handle, point = ?entry.point, "queued datagram re-injected");
                let flow = Flow {
                    in_iface: entry.in_iface,
                    out_iface: entry.out_iface,
                    next_hop: entry.next_hop,
                };
                self.run_stage(
                    entry.point,
                    entry.datagram,
                    flow,
                    Some(entry.queued_by),
                    now,
                    &mut actions,
                );
            }
        }
        Ok(actions)
    }

    /// Drop every incomplete datagram older than the fragment timeout.
    ///
    /// The pipeline also does this on its own, at most once per check
    /// interval, whenever a datagram reaches local delivery.
    pub fn purge_expired_fragments(&mut self, now: SimTime) -> usize {
        self.last_fragment_check = now;
        let purged = self.fragments.purge_expired(now);
        self.stats.dropped += purged as u64;
        purged
    }

    fn run_stage(
        &mut self,
        point: HookPoint,
        mut datagram: Datagram,
        flow: Flow,
        after: Option<HookKey>,
        now: SimTime,
        actions: &mut Vec<IpAction>,
    ) {
        let ctx = HookContext {
            in_iface: flow.in_iface.and_then(|id| self.interfaces.get(id)),
            out_iface: flow.out_iface.and_then(|id| self.interfaces.get(id)),
            next_hop: flow.next_hop,
        };
        match self.hooks.run(point, &mut datagram, &ctx, after) {
            ChainOutcome::Accept => self.continue_after(point, datagram, flow, now, actions),
            ChainOutcome::Drop(key) => {
                tracing::debug!(?point, priority = key.priority, %datagram, "dropped by hook");
                self.stats.dropped += 1;
            }
            ChainOutcome::Queue(key) => {
                let handle = self.queue.push(QueuedDatagram {
                    datagram,
                    point,
                    in_iface: flow.in_iface,
                    out_iface: flow.out_iface,
                    next_hop: flow.next_hop,
                    queued_by: key,
                    queued_at: now,
                });
                actions.push(IpAction::Queued { handle, point });
            }
        }
    }

    /// Everything that follows a stage whose hooks all accepted.
    fn continue_after(
        &mut self,
        point: HookPoint,
        datagram: Datagram,
        flow: Flow,
        now: SimTime,
        actions: &mut Vec<IpAction>,
    ) {
        match point {
            HookPoint::PreRouting => self.route_inbound(datagram, flow, now, actions),
            HookPoint::LocalIn => self.reassemble_and_deliver(datagram, flow, now, actions),
            HookPoint::Forward => {
                self.stats.forwarded += 1;
                self.run_stage(HookPoint::PostRouting, datagram, flow, None, now, actions);
            }
            HookPoint::PostRouting => self.fragment_and_send(datagram, flow, actions),
            HookPoint::LocalOut => self.route_outbound(datagram, flow, now, actions),
        }
    }

    fn route_inbound(
        &mut self,
        datagram: Datagram,
        mut flow: Flow,
        now: SimTime,
        actions: &mut Vec<IpAction>,
    ) {
        let destination = datagram.destination;
        if destination.is_multicast() {
            self.route_inbound_multicast(datagram, flow, now, actions);
            return;
        }
        if self.interfaces.is_local_address(destination) {
            tracing::debug!(%datagram, "local delivery");
            self.run_stage(HookPoint::LocalIn, datagram, flow, None, now, actions);
            return;
        }
        if !self.config.forwarding {
            tracing::debug!(%datagram, "forwarding disabled, dropped");
            self.stats.dropped += 1;
            return;
        }
        let Some(route) = self.routes.longest_prefix_match(destination) else {
            tracing::debug!(%datagram, "unroutable");
            self.stats.unroutable += 1;
            signal(actions, ErrorSignal::NoRoute, datagram);
            return;
        };
        flow.out_iface = Some(route.interface);
        flow.next_hop = route.gateway;
        tracing::debug!(%datagram, out = %route.interface, gateway = ?route.gateway, "forwarding");
        self.run_stage(HookPoint::Forward, datagram, flow, None, now, actions);
    }

    fn route_inbound_multicast(
        &mut self,
        datagram: Datagram,
        flow: Flow,
        now: SimTime,
        actions: &mut Vec<IpAction>,
    ) {
        let group = datagram.destination;
        self.stats.multicast += 1;

        if self.interfaces.is_local_multicast(group) {
            tracing::debug!(%datagram, "multicast for a joined group");
            self.run_stage(HookPoint::LocalIn, datagram.clone(), flow, None, now, actions);
        }
        if !self.config.forwarding || is_link_local_multicast(group) {
            return;
        }
        let outputs = self.multicast_outputs(group, flow.in_iface);
        for out in outputs {
            let copy_flow = Flow {
                out_iface: Some(out),
                next_hop: None,
                ..flow
            };
            self.run_stage(HookPoint::PostRouting, datagram.clone(), copy_flow, None, now, actions);
        }
    }

    fn route_outbound(
        &mut self,
        mut datagram: Datagram,
        mut flow: Flow,
        now: SimTime,
        actions: &mut Vec<IpAction>,
    ) {
        let destination = datagram.destination;

        if destination.is_multicast() {
            let outputs = match flow.out_iface {
                Some(id) => vec![id],
                None => self.multicast_outputs(destination, None),
            };
            if outputs.is_empty() {
                tracing::debug!(%datagram, "no multicast route");
                self.stats.unroutable += 1;
                return;
            }
            for out in outputs {
                let mut copy = datagram.clone();
                if copy.source.is_unspecified()
                    && let Some(iface) = self.interfaces.get(out)
                {
                    copy.source = iface.address;
                }
                let copy_flow = Flow {
                    out_iface: Some(out),
                    next_hop: None,
                    ..flow
                };
                self.run_stage(HookPoint::PostRouting, copy, copy_flow, None, now, actions);
            }
            return;
        }

        if flow.out_iface.is_none() && self.interfaces.is_local_address(destination) {
            if datagram.source.is_unspecified() {
                datagram.source = destination;
            }
            tracing::debug!(%datagram, "sent to self");
            self.run_stage(HookPoint::LocalIn, datagram, flow, None, now, actions);
            return;
        }

        let (out, next_hop) = match flow.out_iface {
            Some(id) => (id, None),
            None => match self.routes.longest_prefix_match(destination) {
                Some(route) => (route.interface, route.gateway),
                None => {
                    tracing::debug!(%datagram, "unroutable");
                    self.stats.unroutable += 1;
                    signal(actions, ErrorSignal::NoRoute, datagram);
                    return;
                }
            },
        };
        if datagram.source.is_unspecified()
            && let Some(iface) = self.interfaces.get(out)
        {
            datagram.source = iface.address;
        }
        flow.out_iface = Some(out);
        flow.next_hop = next_hop;
        self.run_stage(HookPoint::PostRouting, datagram, flow, None, now, actions);
    }

    /// Egress interfaces for `group`, each once, never `exclude`.
    fn multicast_outputs(&self, group: Ipv4Addr, exclude: Option<InterfaceId>) -> Vec<InterfaceId> {
        let mut outputs: Vec<InterfaceId> = Vec::new();
        for route in self.routes.multicast_routes_for(group) {
            if Some(route.interface) != exclude && !outputs.contains(&route.interface) {
                outputs.push(route.interface);
            }
        }
        outputs
    }

    fn reassemble_and_deliver(
        &mut self,
        datagram: Datagram,
        flow: Flow,
        now: SimTime,
        actions: &mut Vec<IpAction>,
    ) {
        if now.saturating_duration_since(self.last_fragment_check)
            >= self.config.fragment_check_interval
        {
            self.purge_expired_fragments(now);
        }

        let datagram = if datagram.is_fragment() {
            match self.fragments.insert_fragment(datagram, now) {
                Ok(Reassembly::Complete(whole)) => whole,
                Ok(Reassembly::Pending) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "malformed fragment discarded");
                    self.stats.dropped += 1;
                    return;
                }
            }
        } else {
            datagram
        };

        let Some(gate) = self.protocols.gate_for(datagram.protocol) else {
            tracing::debug!(%datagram, "no upper layer for protocol");
            self.stats.dropped += 1;
            signal(actions, ErrorSignal::ProtocolUnreachable, datagram);
            return;
        };
        self.stats.local_delivered += 1;
        actions.push(IpAction::DeliverLocal {
            gate,
            packet: DeliveredPacket::from_datagram(datagram, flow.in_iface),
        });
    }

    fn fragment_and_send(&mut self, datagram: Datagram, flow: Flow, actions: &mut Vec<IpAction>) {
        let Some(iface) = flow.out_iface.and_then(|id| self.interfaces.get(id)) else {
            tracing::warn!(out = ?flow.out_iface, %datagram, "egress interface vanished");
            self.stats.dropped += 1;
            return;
        };
        let (out, mtu) = (iface.id(), iface.mtu);

        if datagram.ttl == 0 {
            tracing::debug!(%datagram, "ttl would reach zero on the wire");
            self.stats.dropped += 1;
            signal(actions, ErrorSignal::TimeExceeded, datagram);
            return;
        }
        if datagram.dont_fragment && datagram.total_len() > mtu {
            tracing::debug!(%datagram, mtu, "fragmentation needed but forbidden");
            self.stats.dropped += 1;
            signal(actions, ErrorSignal::FragmentationNeeded { mtu }, datagram);
            return;
        }
        match fragment(datagram, mtu) {
            Ok(pieces) => {
                for piece in pieces {
                    actions.push(IpAction::Transmit {
                        interface: out,
                        next_hop: flow.next_hop,
                        datagram: piece,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, %out, "cannot fragment");
                self.stats.dropped += 1;
            }
        }
    }
}

/// Queue an error report. Multicast datagrams never trigger one.
fn signal(actions: &mut Vec<IpAction>, signal: ErrorSignal, datagram: Datagram) {
    if datagram.is_multicast() {
        return;
    }
    actions.push(IpAction::SignalError { signal, datagram });
}
