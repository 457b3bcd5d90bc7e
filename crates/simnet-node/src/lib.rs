//! Node orchestration for the simnet stack.
//!
//! This crate builds a host from a TOML configuration, sets up logging,
//! keeps the MANET route-maintenance table and replays timed scenarios
//! against the forwarding engine.

pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod manet;
pub mod scenario;

pub use config::NodeConfig;
pub use error::{ManetError, NodeError};
pub use host::Host;
pub use manet::{ManetEntryId, ManetRoute, ManetRoutingTable};
pub use scenario::{Scenario, ScenarioReport};
