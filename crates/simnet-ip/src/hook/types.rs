use std::net::Ipv4Addr;

use simnet_core::{Datagram, InterfaceEntry};

/// Result of a single hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Let the datagram continue to the next hook or stage.
    Accept,
    /// Discard the datagram.
    Drop,
    /// Suspend the datagram until it is re-injected.
    Queue,
}

/// Pipeline stage at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Every datagram from the network, before the routing decision.
    PreRouting,
    /// Datagrams addressed to this host, before reassembly.
    LocalIn,
    /// Transit unicast datagrams after a route was found.
    Forward,
    /// Every datagram about to be fragmented and transmitted.
    PostRouting,
    /// Datagrams built from upper-layer requests, before routing.
    LocalOut,
}

impl HookPoint {
    pub const ALL: [HookPoint; 5] = [
        HookPoint::PreRouting,
        HookPoint::LocalIn,
        HookPoint::Forward,
        HookPoint::PostRouting,
        HookPoint::LocalOut,
    ];

    /// Call the callback of `hook` matching this stage.
    pub fn invoke(self, hook: &dyn Hook, datagram: &mut Datagram, ctx: &HookContext<'_>) -> Verdict {
        match self {
            HookPoint::PreRouting => hook.pre_routing(datagram, ctx),
            HookPoint::LocalIn => hook.local_in(datagram, ctx),
            HookPoint::Forward => hook.forward(datagram, ctx),
            HookPoint::PostRouting => hook.post_routing(datagram, ctx),
            HookPoint::LocalOut => hook.local_out(datagram, ctx),
        }
    }
}

/// What a hook can see besides the datagram itself.
///
/// `in_iface` is set for datagrams from the network. `out_iface` and
/// `next_hop` are set once routing has chosen them: always at FORWARD and
/// POSTROUTING, and at LOCALOUT when the sender pinned an interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookContext<'a> {
    pub in_iface: Option<&'a InterfaceEntry>,
    pub out_iface: Option<&'a InterfaceEntry>,
    pub next_hop: Option<Ipv4Addr>,
}

/// An interceptor registered with the pipeline.
///
/// Implement only the stages of interest; the rest accept. Hooks may rewrite
/// the datagram in place. State kept by a hook needs interior mutability
/// since the pipeline only holds shared references.
pub trait Hook {
    fn pre_routing(&self, _datagram: &mut Datagram, _ctx: &HookContext<'_>) -> Verdict {
        Verdict::Accept
    }

    fn local_in(&self, _datagram: &mut Datagram, _ctx: &HookContext<'_>) -> Verdict {
        Verdict::Accept
    }

    fn forward(&self, _datagram: &mut Datagram, _ctx: &HookContext<'_>) -> Verdict {
        Verdict::Accept
    }

    fn post_routing(&self, _datagram: &mut Datagram, _ctx: &HookContext<'_>) -> Verdict {
        Verdict::Accept
    }

    fn local_out(&self, _datagram: &mut Datagram, _ctx: &HookContext<'_>) -> Verdict {
        Verdict::Accept
    }
}
