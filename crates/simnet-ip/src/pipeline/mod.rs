//! Datagram processing pipeline.
//!
//! ```text
//! from network -> PREROUTING -+-> LOCALIN -> reassembly -> deliver
//!                             +-> FORWARD -> POSTROUTING -> fragment -> transmit
//!                             +-> (multicast relay) POSTROUTING per interface
//! from above   -> LOCALOUT ---+-> POSTROUTING -> fragment -> transmit
//!                             +-> LOCALIN (sent to self)
//! ```

mod dispatch;
mod types;

pub use dispatch::IpLayer;
pub use types::{DeliveredPacket, ErrorSignal, IpAction, IpConfig, IpStats, SendRequest};
