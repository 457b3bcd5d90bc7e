//! Priority-ordered hook registry.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::rc::Rc;

use simnet_core::Datagram;

use super::types::{Hook, HookContext, HookPoint, Verdict};

/// Position of a hook in the chain.
///
/// Ordered by priority, then by registration sequence, which makes equal
/// priorities run in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookKey {
    pub priority: i32,
    seq: u64,
}

/// Result of running the chain for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every hook accepted.
    Accept,
    /// The hook at this key dropped the datagram.
    Drop(HookKey),
    /// The hook at this key queued the datagram. Resume after it.
    Queue(HookKey),
}

/// Registered hooks, lowest priority first.
///
/// One registration covers all five stages; each stage calls its own
/// callback on every hook.
#[derive(Default)]
pub struct HookChain {
    hooks: BTreeMap<HookKey, Rc<dyn Hook>>,
    next_seq: u64,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, priority: i32, hook: Rc<dyn Hook>) -> HookKey {
        let key = HookKey {
            priority,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.hooks.insert(key, hook);
        tracing::debug!(priority, total = self.hooks.len(), "hook registered");
        key
    }

    /// Remove the earliest registration of `hook` at `priority`.
    ///
    /// Matching is by identity. Returns false, and changes nothing, when the
    /// hook is not registered at that priority.
    pub fn unregister(&mut self, priority: i32, hook: &Rc<dyn Hook>) -> bool {
        let found = self
            .hooks
            .iter()
            .find(|(k, h)| k.priority == priority && Rc::ptr_eq(h, hook))
            .map(|(k, _)| *k);
        match found {
            Some(key) => {
                self.hooks.remove(&key);
                tracing::debug!(priority, total = self.hooks.len(), "hook unregistered");
                true
            }
            None => false,
        }
    }

    /// Run the hooks for `point` in order, starting after `after` if given.
    ///
    /// Stops at the first DROP or QUEUE.
    pub fn run(
        &self,
        point: HookPoint,
        datagram: &mut Datagram,
        ctx: &HookContext<'_>,
        after: Option<HookKey>,
    ) -> ChainOutcome {
        let start = after.map_or(Bound::Unbounded, Bound::Excluded);
        for (key, hook) in self.hooks.range((start, Bound::Unbounded)) {
            let verdict = point.invoke(hook.as_ref(), datagram, ctx);
            tracing::trace!(?point, priority = key.priority, ?verdict, "hook verdict");
            match verdict {
                Verdict::Accept => {}
                Verdict::Drop => return ChainOutcome::Drop(*key),
                Verdict::Queue => return ChainOutcome::Queue(*key),
            }
        }
        ChainOutcome::Accept
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
