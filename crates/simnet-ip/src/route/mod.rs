//! Route table with longest-prefix-match lookup.
//!
//! The table is owned by the host; the forwarding pipeline only queries it,
//! while route-maintenance components add and remove entries between
//! datagram events.

pub mod table;
pub mod types;

pub use table::RoutingTable;
pub use types::{Route, RouteId, RouteKind, RouteSource};
