//! Hook chain: priority-ordered interceptors at five pipeline stages.
//!
//! A hook may accept a datagram, drop it, or queue it. Queued datagrams are
//! parked in a [`HookQueue`] until an external actor re-injects them with a
//! final verdict.

pub mod chain;
pub mod queue;
pub mod types;

pub use chain::{ChainOutcome, HookChain, HookKey};
pub use queue::{HookQueue, QueueHandle, QueuedDatagram};
pub use types::{Hook, HookContext, HookPoint, Verdict};
