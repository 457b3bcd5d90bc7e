//! Network layer constants.

/// Length of a header without options.
pub const BASE_HEADER_LEN: usize = 20;

/// Largest header the 4-bit IHL field can describe.
pub const MAX_HEADER_LEN: usize = 60;

/// Largest datagram the 16-bit total length field can describe.
pub const MAX_DATAGRAM_LEN: usize = 65_535;

/// Fragment offsets are expressed in units of this many bytes on the wire.
pub const FRAGMENT_UNIT: usize = 8;

/// Default hop limit for unicast datagrams built by this host.
pub const DEFAULT_TTL: u8 = 32;

/// Default hop limit for multicast datagrams built by this host.
pub const DEFAULT_MULTICAST_TTL: u8 = 32;

/// Typical Ethernet MTU, used when an interface does not specify one.
pub const DEFAULT_MTU: usize = 1500;
