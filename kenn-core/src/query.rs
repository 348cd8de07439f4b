//! Read-only views over an agent's interest set.
//!
//! Every accessor returns an owned snapshot, safe to iterate while other
//! threads keep mutating the underlying collections.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::interest::Relation;
use crate::types::{AgentId, Timestamp, Variation};

/// Sizes of all six collections at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterestSummary {
    /// Known agents.
    pub known: usize,
    /// Visible agents.
    pub visible: usize,
    /// Agents pending destruction.
    pub pending_destruction: usize,
    /// Players that know this agent.
    pub known_observers: usize,
    /// Combat targets.
    pub targets: usize,
    /// Provoked targets.
    pub retaliate_targets: usize,
}

impl fmt::Display for InterestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "known={} visible={} pending={} observers={} targets={} retaliate={}",
            self.known,
            self.visible,
            self.pending_destruction,
            self.known_observers,
            self.targets,
            self.retaliate_targets
        )
    }
}

impl Agent {
    /// Number of entries in a relation.
    #[must_use]
    pub fn count(&self, relation: Relation) -> usize {
        self.interest.len(relation)
    }

    /// Whether `id` is present in a relation.
    #[must_use]
    pub fn contains(&self, relation: Relation, id: AgentId) -> bool {
        self.interest.contains(relation, id)
    }

    /// The live agent behind `id` in a relation.
    #[must_use]
    pub fn get(&self, relation: Relation, id: AgentId) -> Option<Arc<Agent>> {
        match self.interest.edges(relation) {
            Some(map) => map.get(&id).and_then(|e| e.value().upgrade()),
            None => self
                .interest
                .pending
                .get(&id)
                .and_then(|e| e.value().agent.upgrade()),
        }
    }

    /// Live agents in a relation.
    #[must_use]
    pub fn snapshot(&self, relation: Relation) -> Vec<Arc<Agent>> {
        self.interest.peers(relation)
    }

    /// Live agents in a relation that satisfy `predicate`.
    #[must_use]
    pub fn snapshot_where<F>(&self, relation: Relation, predicate: F) -> Vec<Arc<Agent>>
    where
        F: Fn(&Agent) -> bool,
    {
        let mut peers = self.interest.peers(relation);
        peers.retain(|peer| predicate(Arc::as_ref(peer)));
        peers
    }

    /// Known monsters, pets and other non-player agents.
    #[must_use]
    pub fn known_creatures(&self) -> Vec<Arc<Agent>> {
        self.snapshot_where(Relation::Known, |a| !a.is_player())
    }

    /// Visible non-player agents.
    #[must_use]
    pub fn visible_creatures(&self) -> Vec<Arc<Agent>> {
        self.snapshot_where(Relation::Visible, |a| !a.is_player())
    }

    /// Visible agents tagged with `variation`.
    #[must_use]
    pub fn visible_in_variation(&self, variation: Option<Variation>) -> Vec<Arc<Agent>> {
        self.snapshot_where(Relation::Visible, |a| a.variation() == variation)
    }

    /// Known players.
    #[must_use]
    pub fn known_players(&self) -> Vec<Arc<Agent>> {
        self.snapshot_where(Relation::Known, Agent::is_player)
    }

    /// Players that currently know about this agent.
    #[must_use]
    pub fn known_observers(&self) -> Vec<Arc<Agent>> {
        self.snapshot(Relation::KnownObservers)
    }

    /// Targets sharing this agent's variation.
    #[must_use]
    pub fn target_creatures(&self) -> Vec<Arc<Agent>> {
        let own = self.variation();
        self.snapshot_where(Relation::Targets, |a| a.variation() == own)
    }

    /// Copy of the pending-destruction queue.
    #[must_use]
    pub fn pending_destruction(&self) -> Vec<(AgentId, Timestamp)> {
        self.interest.pending_expiries()
    }

    /// Sizes of all six collections.
    #[must_use]
    pub fn summary(&self) -> InterestSummary {
        InterestSummary {
            known: self.count(Relation::Known),
            visible: self.count(Relation::Visible),
            pending_destruction: self.count(Relation::PendingDestruction),
            known_observers: self.count(Relation::KnownObservers),
            targets: self.count(Relation::Targets),
            retaliate_targets: self.count(Relation::RetaliateTargets),
        }
    }
}
