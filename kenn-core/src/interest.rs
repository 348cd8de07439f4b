//! Per-agent relationship collections.
//!
//! An [`InterestSet`] holds six concurrent maps from peer id to a [`Weak`]
//! handle of the peer. The handle is a lookup reference with a liveness
//! check; the peer itself is owned by the [`crate::world::World`].
//!
//! ```text
//!   Known ⊇ Visible            PendingDestruction ∩ Visible = ∅
//!   Targets ⊇ RetaliateTargets KnownObservers: players whose Known ∋ owner
//! ```
//!
//! Mutation rules live on [`Agent`] (see `agent`, `destruction`,
//! `teardown`); this module only stores edges and knows how to snapshot
//! them.

use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::agent::Agent;
use crate::types::{AgentId, Timestamp};

/// Edge map shared by five of the six collections.
pub(crate) type EdgeMap = DashMap<AgentId, Weak<Agent>>;

/// The six public relationship collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Agents this agent is aware of.
    Known,
    /// Agents currently within perceptual range.
    Visible,
    /// Agents out of range, waiting to be forgotten.
    PendingDestruction,
    /// Players that currently know about this agent.
    KnownObservers,
    /// Combat target candidates.
    Targets,
    /// Provoked targets outside the normal policy.
    RetaliateTargets,
}

impl Relation {
    /// Every relation, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::Known,
        Self::Visible,
        Self::PendingDestruction,
        Self::KnownObservers,
        Self::Targets,
        Self::RetaliateTargets,
    ];
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Known => "known",
            Self::Visible => "visible",
            Self::PendingDestruction => "pending_destruction",
            Self::KnownObservers => "known_observers",
            Self::Targets => "targets",
            Self::RetaliateTargets => "retaliate_targets",
        };
        f.write_str(name)
    }
}

/// An agent that left visibility and will be forgotten at `expires_at`.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    /// Handle of the departed agent.
    pub agent: Weak<Agent>,
    /// When the entry becomes eligible for the sweep.
    pub expires_at: Timestamp,
}

/// Result of inserting an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    /// The edge is new.
    Inserted,
    /// The edge already existed.
    Present,
    /// One side is torn down; nothing was kept.
    Refused,
}

/// The per-agent relationship collections.
#[derive(Debug, Default)]
pub struct InterestSet {
    pub(crate) known: EdgeMap,
    pub(crate) visible: EdgeMap,
    pub(crate) pending: DashMap<AgentId, PendingEntry>,
    pub(crate) observers: EdgeMap,
    pub(crate) targets: EdgeMap,
    pub(crate) retaliate: EdgeMap,
    /// Agents whose collections may reference the owner. Superset; stale
    /// entries are harmless because removal is idempotent.
    pub(crate) referrers: EdgeMap,
}

impl InterestSet {
    /// Create an empty interest set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The edge map behind a relation. `None` for `PendingDestruction`,
    /// whose entries carry an expiry.
    pub(crate) fn edges(&self, relation: Relation) -> Option<&EdgeMap> {
        match relation {
            Relation::Known => Some(&self.known),
            Relation::Visible => Some(&self.visible),
            Relation::PendingDestruction => None,
            Relation::KnownObservers => Some(&self.observers),
            Relation::Targets => Some(&self.targets),
            Relation::RetaliateTargets => Some(&self.retaliate),
        }
    }

    /// Number of entries in a relation.
    #[must_use]
    pub fn len(&self, relation: Relation) -> usize {
        match self.edges(relation) {
            Some(map) => map.len(),
            None => self.pending.len(),
        }
    }

    /// Whether every relation is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Relation::ALL.iter().all(|r| self.len(*r) == 0)
    }

    /// Whether `id` is present in a relation.
    #[must_use]
    pub fn contains(&self, relation: Relation, id: AgentId) -> bool {
        match self.edges(relation) {
            Some(map) => map.contains_key(&id),
            None => self.pending.contains_key(&id),
        }
    }

    /// Point-in-time copy of the ids in a relation.
    #[must_use]
    pub fn ids(&self, relation: Relation) -> Vec<AgentId> {
        match self.edges(relation) {
            Some(map) => map.iter().map(|e| *e.key()).collect(),
            None => self.pending.iter().map(|e| *e.key()).collect(),
        }
    }

    /// Point-in-time copy of the live peers in a relation. Handles whose
    /// agent has been dropped are skipped.
    #[must_use]
    pub fn peers(&self, relation: Relation) -> Vec<Arc<Agent>> {
        match self.edges(relation) {
            Some(map) => map.iter().filter_map(|e| e.value().upgrade()).collect(),
            None => self
                .pending
                .iter()
                .filter_map(|e| e.value().agent.upgrade())
                .collect(),
        }
    }

    /// Copy of the pending-destruction queue (id → expiry).
    #[must_use]
    pub fn pending_expiries(&self) -> Vec<(AgentId, Timestamp)> {
        self.pending
            .iter()
            .map(|e| (*e.key(), e.value().expires_at))
            .collect()
    }

    /// Live agents that may hold edges to the owner.
    pub(crate) fn referrer_peers(&self) -> Vec<Arc<Agent>> {
        self.referrers
            .iter()
            .filter_map(|e| e.value().upgrade())
            .collect()
    }

    /// Empty every collection, the referrer index included.
    pub(crate) fn clear(&self) {
        self.visible.clear();
        self.known.clear();
        self.pending.clear();
        self.observers.clear();
        self.retaliate.clear();
        self.targets.clear();
        self.referrers.clear();
    }
}

/// Insert `peer` into `map` unless already present.
///
/// Membership test and insert happen under one shard lock, so concurrent
/// callers agree on which of them inserted.
pub(crate) fn insert_edge(map: &EdgeMap, id: AgentId, peer: &Weak<Agent>) -> bool {
    match map.entry(id) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(peer.clone());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_reports_zero_everywhere() {
        let set = InterestSet::new();
        assert!(set.is_empty());
        for relation in Relation::ALL {
            assert_eq!(set.len(relation), 0);
            assert!(set.ids(relation).is_empty());
        }
    }

    #[test]
    fn insert_edge_is_idempotent() {
        let map = EdgeMap::default();
        let dangling = Weak::new();
        assert!(insert_edge(&map, AgentId(7), &dangling));
        assert!(!insert_edge(&map, AgentId(7), &dangling));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn dead_handles_are_skipped_in_snapshots() {
        let set = InterestSet::new();
        set.known.insert(AgentId(1), Weak::new());
        assert_eq!(set.len(Relation::Known), 1);
        assert!(set.peers(Relation::Known).is_empty());
        assert_eq!(set.ids(Relation::Known), vec![AgentId(1)]);
    }

    #[test]
    fn relation_names() {
        assert_eq!(Relation::PendingDestruction.to_string(), "pending_destruction");
        assert_eq!(Relation::ALL.len(), 6);
    }
}
