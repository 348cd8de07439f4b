//! Delayed destruction: agents that left visibility stay known for a grace
//! period so a quick return does not force the client to rebuild them.
//!
//! Cancellation and the sweep both claim an entry with `remove_if` under
//! complementary expiry predicates. Whichever runs first wins; the other
//! finds nothing.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tracing::{debug, debug_span, trace};

use crate::agent::Agent;
use crate::interest::PendingEntry;
use crate::metrics::{InterestCounters, spans};
use crate::types::{AgentId, Timestamp};

impl Agent {
    /// Queue `obj` for destruction after the configured grace period.
    ///
    /// `obj` leaves Visible first (dropping the monster's reverse target).
    /// Returns `false` if it was already queued; the existing expiry is kept.
    pub fn add_to_pending_destruction(&self, obj: &Agent) -> bool {
        self.remove_visible(obj, true);
        if self.is_torn_down() || obj.is_torn_down() {
            return false;
        }

        let expires_at = self.ctx.now().plus(self.ctx.config.destruction_time_secs);
        match self.interest.pending.entry(obj.id()) {
            Entry::Occupied(_) => {
                trace!(owner = %self.id(), peer = %obj.id(), "Already pending destruction");
                return false;
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    agent: obj.handle().clone(),
                    expires_at,
                });
            }
        }
        obj.interest
            .referrers
            .insert(self.id(), self.handle().clone());
        if self.is_torn_down() || obj.is_torn_down() {
            self.interest.pending.remove(&obj.id());
            return false;
        }
        InterestCounters::bump(&self.ctx.counters.pending_queued);
        trace!(owner = %self.id(), peer = %obj.id(), %expires_at, "Queued for destruction");
        true
    }

    /// Queue every agent in `objs`; returns those that were newly queued.
    pub fn add_to_pending_destruction_batch(&self, objs: &[Arc<Agent>]) -> Vec<Arc<Agent>> {
        objs.iter()
            .filter(|obj| self.add_to_pending_destruction(obj))
            .cloned()
            .collect()
    }

    /// Cancel a pending destruction that is still inside its grace period.
    ///
    /// An expired entry is left for the sweep and `false` is returned.
    pub fn remove_from_pending_destruction(&self, obj: &Agent) -> bool {
        let now = self.ctx.now();
        let cancelled = self
            .interest
            .pending
            .remove_if(&obj.id(), |_, entry| entry.expires_at > now)
            .is_some();
        if cancelled {
            InterestCounters::bump(&self.ctx.counters.pending_cancelled);
            trace!(owner = %self.id(), peer = %obj.id(), "Pending destruction cancelled");
        }
        cancelled
    }

    /// Take ownership of an expired entry. `None` if it was cancelled,
    /// already claimed or not yet due.
    pub(crate) fn claim_expired(&self, id: AgentId, now: Timestamp) -> Option<PendingEntry> {
        self.interest
            .pending
            .remove_if(&id, |_, entry| entry.expires_at <= now)
            .map(|(_, entry)| entry)
    }

    /// Forget every pending agent whose grace period has run out.
    ///
    /// Each expired entry is claimed atomically and then removed from all
    /// collections (with back-edges). Entries whose agent no longer exists
    /// are purged by id. Returns the live agents that were forgotten.
    pub fn sweep(&self) -> Vec<Arc<Agent>> {
        let now = self.ctx.now();
        let due: Vec<AgentId> = self
            .interest
            .pending
            .iter()
            .filter(|e| e.value().expires_at <= now)
            .map(|e| *e.key())
            .collect();
        if due.is_empty() {
            return Vec::new();
        }
        let _span = debug_span!(spans::SWEEP, owner = %self.id(), due = due.len()).entered();

        let mut forgotten = Vec::with_capacity(due.len());
        for id in due {
            let Some(entry) = self.claim_expired(id, now) else {
                continue;
            };
            InterestCounters::bump(&self.ctx.counters.pending_expired);
            match entry.agent.upgrade() {
                Some(obj) => {
                    self.remove(&obj, true);
                    forgotten.push(obj);
                }
                None => self.purge_id(id),
            }
        }

        if !forgotten.is_empty() {
            debug!(
                owner = %self.id(),
                forgotten = forgotten.len(),
                remaining = self.interest.pending.len(),
                "Pending destruction sweep"
            );
        }
        forgotten
    }
}
