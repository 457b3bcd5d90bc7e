//! Reassembly buffer for fragmented datagrams.
//!
//! Fragments may arrive out of order, duplicated or overlapping. Each
//! partially received datagram tracks the byte ranges it has seen; it is
//! complete once those ranges cover `[0, total)` and both the first and the
//! last fragment have arrived. Incomplete entries are dropped by
//! [`ReassemblyBuffer::purge_expired`], which the pipeline calls
//! opportunistically. There is no timer.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::ops::Range;
use std::time::Duration;

use simnet_core::constants::{FRAGMENT_UNIT, MAX_DATAGRAM_LEN};
use simnet_core::{Datagram, ProtocolId, SimTime};

use crate::constants::FRAGMENT_TIMEOUT;
use crate::error::FragmentError;

/// Identifies the original datagram a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: ProtocolId,
    pub identification: u16,
}

impl FragmentKey {
    pub fn of(datagram: &Datagram) -> Self {
        Self {
            source: datagram.source,
            destination: datagram.destination,
            protocol: datagram.protocol,
            identification: datagram.identification,
        }
    }
}

/// Outcome of adding one fragment.
#[derive(Debug, PartialEq, Eq)]
pub enum Reassembly {
    /// The fragment completed its datagram; the entry has been removed.
    Complete(Datagram),
    /// More fragments are needed.
    Pending,
}

/// State for one partially received datagram.
#[derive(Debug)]
struct PartialDatagram {
    /// Sorted, non-overlapping, non-adjacent byte ranges received so far.
    received: Vec<Range<usize>>,
    data: Vec<u8>,
    /// Known once the fragment without the more-fragments flag arrives.
    total_len: Option<usize>,
    /// Header of the offset-0 fragment, payload stripped.
    header: Option<Datagram>,
    last_update: SimTime,
}

impl PartialDatagram {
    fn new(now: SimTime) -> Self {
        Self {
            received: Vec::new(),
            data: Vec::new(),
            total_len: None,
            header: None,
            last_update: now,
        }
    }

    fn mark_received(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        self.received.push(range);
        self.received.sort_by_key(|r| r.start);
        let mut merged: Vec<Range<usize>> = Vec::with_capacity(self.received.len());
        for r in self.received.drain(..) {
            match merged.last_mut() {
                Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
                _ => merged.push(r),
            }
        }
        self.received = merged;
    }

    fn highest_received(&self) -> usize {
        self.received.last().map_or(0, |r| r.end)
    }

    fn is_complete(&self) -> bool {
        match (self.total_len, &self.header) {
            (Some(0), Some(_)) => true,
            (Some(total), Some(_)) => self.received.len() == 1 && self.received[0] == (0..total),
            _ => false,
        }
    }

    fn is_expired(&self, now: SimTime, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_update) > timeout
    }
}

/// Buffer of partially reassembled datagrams keyed by [`FragmentKey`].
pub struct ReassemblyBuffer {
    entries: HashMap<FragmentKey, PartialDatagram>,
    timeout: Duration,
}

impl ReassemblyBuffer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            timeout,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Merge a fragment into its datagram.
    ///
    /// On error the whole partial datagram for the fragment's key is
    /// discarded, so a malformed fragment never leaves state behind.
    pub fn insert_fragment(
        &mut self,
        fragment: Datagram,
        now: SimTime,
    ) -> Result<Reassembly, FragmentError> {
        let key = FragmentKey::of(&fragment);
        match self.merge(key, fragment, now) {
            Ok(true) => Ok(self
                .entries
                .remove(&key)
                .and_then(assemble)
                .map_or(Reassembly::Pending, Reassembly::Complete)),
            Ok(false) => Ok(Reassembly::Pending),
            Err(e) => {
                self.entries.remove(&key);
                Err(e)
            }
        }
    }

    /// Returns whether the entry for `key` is now complete.
    fn merge(
        &mut self,
        key: FragmentKey,
        mut fragment: Datagram,
        now: SimTime,
    ) -> Result<bool, FragmentError> {
        let start = usize::from(fragment.fragment_offset);
        let end = start + fragment.payload.len();
        if end > MAX_DATAGRAM_LEN {
            return Err(FragmentError::TooLarge { end });
        }
        if fragment.more_fragments && fragment.payload.len() % FRAGMENT_UNIT != 0 {
            return Err(FragmentError::Misaligned(fragment.payload.len()));
        }

        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| PartialDatagram::new(now));

        if !fragment.more_fragments {
            let conflicting = entry.total_len.is_some_and(|t| t != end);
            if conflicting || entry.highest_received() > end {
                return Err(FragmentError::OutOfBounds {
                    start,
                    end,
                    total: entry.total_len.unwrap_or(end),
                });
            }
            entry.total_len = Some(end);
        } else if let Some(total) = entry.total_len {
            if end > total {
                return Err(FragmentError::OutOfBounds { start, end, total });
            }
        }

        if entry.data.len() < end {
            entry.data.resize(end, 0);
        }
        entry.data[start..end].copy_from_slice(&fragment.payload);
        entry.mark_received(start..end);

        if start == 0 {
            fragment.payload = Vec::new();
            entry.header = Some(fragment);
        }
        entry.last_update = now;

        tracing::trace!(
            ?key,
            start,
            end,
            ranges = entry.received.len(),
            "fragment merged"
        );
        Ok(entry.is_complete())
    }

    /// Drop every entry not updated within the timeout. Returns the count.
    pub fn purge_expired(&mut self, now: SimTime) -> usize {
        let timeout = self.timeout;
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now, timeout));
        let purged = before - self.entries.len();
        if purged > 0 {
            tracing::debug!(purged, "stale fragments purged");
        }
        purged
    }

    #[must_use]
    pub fn contains(&self, key: &FragmentKey) -> bool {
        self.entries.contains_key(key)
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

impl Default for ReassemblyBuffer {
    fn default() -> Self {
        Self::new(FRAGMENT_TIMEOUT)
    }
}

fn assemble(entry: PartialDatagram) -> Option<Datagram> {
    let mut datagram = entry.header?;
    let mut data = entry.data;
    data.truncate(entry.total_len?);
    datagram.payload = data;
    datagram.fragment_offset = 0;
    datagram.more_fragments = false;
    Some(datagram)
}
