//! Upper-layer dispatch table: protocol id to output gate.

use std::collections::BTreeMap;
use std::str::FromStr;

use simnet_core::ProtocolId;

use crate::constants::DEFAULT_PROTOCOL_MAPPING;
use crate::error::IpError;

/// Maps protocol identifiers to the upper-layer gate that receives them.
///
/// Parsed from a mapping string of comma separated `protocol:gate` pairs,
/// for example `"6:0,17:1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMap {
    gates: BTreeMap<ProtocolId, usize>,
}

impl ProtocolMap {
    pub fn new() -> Self {
        Self {
            gates: BTreeMap::new(),
        }
    }

    /// Gate for `protocol`, if mapped.
    #[must_use]
    pub fn gate_for(&self, protocol: ProtocolId) -> Option<usize> {
        self.gates.get(&protocol).copied()
    }

    /// Map `protocol` to `gate`. Fails if the protocol is already mapped.
    pub fn insert(&mut self, protocol: ProtocolId, gate: usize) -> Result<(), IpError> {
        if self.gates.contains_key(&protocol) {
            return Err(IpError::DuplicateProtocol(protocol));
        }
        self.gates.insert(protocol, gate);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProtocolId, usize)> + '_ {
        self.gates.iter().map(|(p, g)| (*p, *g))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

impl Default for ProtocolMap {
    fn default() -> Self {
        // the built-in mapping string is known to parse
        DEFAULT_PROTOCOL_MAPPING.parse().unwrap_or_else(|_| Self::new())
    }
}

impl FromStr for ProtocolMap {
    type Err = IpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut map = Self::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let invalid = || IpError::InvalidProtocolMapping(pair.to_string());
            let (proto, gate) = pair.split_once(':').ok_or_else(invalid)?;
            let proto: u8 = proto.trim().parse().map_err(|_| invalid())?;
            let gate: usize = gate.trim().parse().map_err(|_| invalid())?;
            map.insert(ProtocolId(proto), gate)?;
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mapping() {
        let map = ProtocolMap::default();
        assert_eq!(map.len(), 5);
        assert_eq!(map.gate_for(ProtocolId::TCP), Some(0));
        assert_eq!(map.gate_for(ProtocolId::UDP), Some(1));
        assert_eq!(map.gate_for(ProtocolId::ICMP), Some(2));
        assert_eq!(map.gate_for(ProtocolId::IGMP), Some(3));
        assert_eq!(map.gate_for(ProtocolId::RSVP), Some(4));
        assert_eq!(map.gate_for(ProtocolId::MANET), None);
    }

    #[test]
    fn tolerates_whitespace_and_empty_pairs() {
        let map: ProtocolMap = " 17 : 2 , ,138:5,".parse().unwrap();
        assert_eq!(map.gate_for(ProtocolId::UDP), Some(2));
        assert_eq!(map.gate_for(ProtocolId::MANET), Some(5));
        assert!("".parse::<ProtocolMap>().unwrap().is_empty());
    }

    #[test]
    fn malformed_pairs_rejected() {
        for bad in ["6", "6:x", "300:1", "a:b", "6:-1"] {
            assert!(
                matches!(bad.parse::<ProtocolMap>(), Err(IpError::InvalidProtocolMapping(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn duplicate_protocol_rejected() {
        assert_eq!(
            "6:0,6:1".parse::<ProtocolMap>(),
            Err(IpError::DuplicateProtocol(ProtocolId::TCP))
        );
    }
}
