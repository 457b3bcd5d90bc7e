//! Datagram fragmentation on send and reassembly on local delivery.

pub mod buffer;
pub mod split;

pub use buffer::{FragmentKey, Reassembly, ReassemblyBuffer};
pub use split::fragment;
