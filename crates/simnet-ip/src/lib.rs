//! Network-layer forwarding engine for the simnet stack.
//!
//! This crate handles route lookup, datagram fragmentation and reassembly,
//! the priority-ordered hook chain, and the pipeline that moves each datagram
//! from arrival to local delivery or transmission.

pub mod constants;
pub mod error;
pub mod fragment;
pub mod hook;
pub mod pipeline;
pub mod protocol_map;
pub mod route;

pub use error::{FragmentError, IpError, RouteError};
pub use fragment::{FragmentKey, Reassembly, ReassemblyBuffer};
pub use hook::{Hook, HookContext, HookKey, HookPoint, QueueHandle, Verdict};
pub use pipeline::{DeliveredPacket, ErrorSignal, IpAction, IpConfig, IpLayer, IpStats, SendRequest};
pub use protocol_map::ProtocolMap;
pub use route::{Route, RouteId, RouteKind, RouteSource, RoutingTable};
