//! Core types for the simnet network layer.
//!
//! This crate defines addresses and network prefixes, the datagram envelope,
//! the interface table and the simulated clock shared by the forwarding
//! engine and the node orchestrator.

pub mod address;
pub mod constants;
pub mod datagram;
pub mod error;
pub mod interface;
pub mod time;

pub use address::Ipv4Network;
pub use datagram::{Datagram, ProtocolId};
pub use error::{AddressError, InterfaceError};
pub use interface::{InterfaceEntry, InterfaceId, InterfaceTable};
pub use time::SimTime;
