//! Spatial-query seam.
//!
//! The interest core does not own positions or a broad phase. A host plugs
//! in a [`SpatialIndex`] that returns raw candidates near an agent; the
//! [`crate::world::World`] then drops self, foreign variations and anything
//! the [`CandidateFilter`] rejects.

use std::sync::Arc;

use crate::agent::Agent;
use crate::types::AgentId;

pub use crate::classifier::CandidateFilter;

/// Broad-phase lookup of agents near an observer.
pub trait SpatialIndex: Send + Sync {
    /// Raw candidates around `observer`. May include `observer` itself and
    /// agents of other variations.
    ///
    /// `filter` is a hint; implementations are free to ignore it.
    fn candidates_near(&self, observer: &Agent, filter: CandidateFilter) -> Vec<Arc<Agent>>;

    /// Start tracking an agent.
    fn register(&self, agent: &Arc<Agent>);

    /// Stop tracking an agent.
    fn deregister(&self, id: AgentId);

    /// The agent's location changed.
    fn relocate(&self, _agent: &Arc<Agent>) {}
}

/// An index that knows nothing. For worlds driven purely by explicit calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unindexed;

impl SpatialIndex for Unindexed {
    fn candidates_near(&self, _observer: &Agent, _filter: CandidateFilter) -> Vec<Arc<Agent>> {
        Vec::new()
    }

    fn register(&self, _agent: &Arc<Agent>) {}

    fn deregister(&self, _id: AgentId) {}
}
