//! Forwarding engine constants.

use std::time::Duration;

/// How long an incomplete datagram may wait for its remaining fragments.
pub const FRAGMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Minimum simulated time between two stale-fragment purges.
pub const FRAGMENT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Default upper-layer mapping: TCP, UDP, ICMP, IGMP, RSVP.
pub const DEFAULT_PROTOCOL_MAPPING: &str = "6:0,17:1,1:2,2:3,46:4";

/// ICMP message types and codes used by [`ErrorSignal`](crate::pipeline::ErrorSignal).
pub mod icmp {
    pub const DESTINATION_UNREACHABLE: u8 = 3;
    pub const TIME_EXCEEDED: u8 = 11;

    pub const NET_UNREACHABLE: u8 = 0;
    pub const PROTOCOL_UNREACHABLE: u8 = 2;
    /// Fragmentation needed, but the don't-fragment bit is set.
    pub const FRAGMENTATION_ERROR_CODE: u8 = 4;
    pub const TTL_EXCEEDED_IN_TRANSIT: u8 = 0;
}
