//! Error types for the node orchestrator.

use simnet_core::InterfaceError;
use simnet_ip::{IpError, RouteError};

use crate::manet::ManetEntryId;

/// Errors that can occur while building or driving a host.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("interface error: {0}")]
    Interface(#[from] InterfaceError),
    #[error("forwarding error: {0}")]
    Ip(#[from] IpError),
    #[error("manet error: {0}")]
    Manet(#[from] ManetError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("scenario error: {0}")]
    Scenario(String),
}

/// Errors raised by the MANET route-maintenance table.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManetError {
    #[error("no such interface: {0}")]
    UnknownInterface(String),
    #[error("unknown manet routing entry: {0}")]
    UnknownEntry(ManetEntryId),
    #[error("route error: {0}")]
    Route(#[from] RouteError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use simnet_ip::RouteId;

    #[test]
    fn node_error_display() {
        let err = NodeError::Config("bad ttl".into());
        assert_eq!(err.to_string(), "configuration error: bad ttl");

        let err: NodeError = ManetError::UnknownInterface("wlan9".into()).into();
        assert_eq!(err.to_string(), "manet error: no such interface: wlan9");
    }

    #[test]
    fn manet_error_from_route() {
        let err: ManetError = RouteError::UnknownRoute(RouteId(4)).into();
        assert_eq!(
            err.to_string(),
            "route error: unknown routing entry requested to be deleted: route#4"
        );
    }
}
