//! Error types for the simnet-core crate.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid prefix length: {0}")]
    InvalidPrefixLength(u8),

    #[error("invalid network '{0}'")]
    InvalidNetwork(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("duplicate interface name: {0}")]
    DuplicateName(String),

    #[error("no such interface: {0}")]
    UnknownName(String),

    #[error("invalid mtu {mtu} for interface {name}")]
    InvalidMtu { name: String, mtu: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_error_display() {
        let err = AddressError::InvalidPrefixLength(33);
        assert_eq!(err.to_string(), "invalid prefix length: 33");

        let err = AddressError::InvalidNetwork("10.0.0/8".to_string());
        assert_eq!(err.to_string(), "invalid network '10.0.0/8'");
    }

    #[test]
    fn test_interface_error_display() {
        let err = InterfaceError::UnknownName("wlan7".to_string());
        assert_eq!(err.to_string(), "no such interface: wlan7");

        let err = InterfaceError::InvalidMtu {
            name: "eth0".to_string(),
            mtu: 10,
        };
        assert_eq!(err.to_string(), "invalid mtu 10 for interface eth0");
    }
}
