//! Datagrams suspended by a QUEUE verdict.

use core::fmt;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use simnet_core::{Datagram, InterfaceId, SimTime};

use super::chain::HookKey;
use super::types::HookPoint;

/// Handle returned to the caller when a datagram is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueHandle(pub u64);

impl fmt::Display for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// A suspended datagram and everything needed to resume it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedDatagram {
    pub datagram: Datagram,
    pub point: HookPoint,
    pub in_iface: Option<InterfaceId>,
    pub out_iface: Option<InterfaceId>,
    pub next_hop: Option<Ipv4Addr>,
    /// The hook that queued it. Re-injection resumes with the next one.
    pub queued_by: HookKey,
    pub queued_at: SimTime,
}

/// Queued datagrams, exclusively owned until re-injected.
#[derive(Debug, Default)]
pub struct HookQueue {
    entries: BTreeMap<QueueHandle, QueuedDatagram>,
    next_handle: u64,
}

impl HookQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueuedDatagram) -> QueueHandle {
        let handle = QueueHandle(self.next_handle);
        self.next_handle += 1;
        tracing::debug!(%handle, point = ?entry.point, datagram = %entry.datagram, "datagram queued");
        self.entries.insert(handle, entry);
        handle
    }

    #[must_use]
    pub fn get(&self, handle: QueueHandle) -> Option<&QueuedDatagram> {
        self.entries.get(&handle)
    }

    pub fn take(&mut self, handle: QueueHandle) -> Option<QueuedDatagram> {
        self.entries.remove(&handle)
    }

    /// Handles in queueing order.
    pub fn handles(&self) -> impl Iterator<Item = QueueHandle> + '_ {
        self.entries.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
