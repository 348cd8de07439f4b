//! The agent registry.
//!
//! A [`World`] owns every live [`Agent`] (`Arc`), the shared
//! [`InterestContext`] and the host's [`SpatialIndex`]. Interest sets only
//! hold `Weak` handles, so dropping an agent from the registry is what
//! ends its life.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use crate::agent::{Agent, AgentBuilder, InterestContext};
use crate::classifier::{CandidateFilter, classify};
use crate::clock::{Clock, MonotonicClock};
use crate::config::InterestConfig;
use crate::error::{KennError, Result};
use crate::interest::Relation;
use crate::metrics::InterestCounters;
use crate::spatial::{SpatialIndex, Unindexed};
use crate::types::AgentId;

/// Registry of live agents plus their shared context.
pub struct World {
    agents: DashMap<AgentId, Arc<Agent>>,
    ctx: Arc<InterestContext>,
    spatial: Arc<dyn SpatialIndex>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("agents", &self.agents.len())
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Create a world around a clock and a spatial index.
    #[must_use]
    pub fn new(
        config: InterestConfig,
        clock: Arc<dyn Clock>,
        spatial: Arc<dyn SpatialIndex>,
    ) -> Self {
        info!(
            clamp = config.initial_clamp,
            clamp_distance = config.clamp_distance,
            destruction_time_secs = config.destruction_time_secs,
            "Interest world created"
        );
        Self {
            agents: DashMap::new(),
            ctx: Arc::new(InterestContext::new(config, clock)),
            spatial,
        }
    }

    /// A world with a monotonic clock and no spatial index.
    #[must_use]
    pub fn detached(config: InterestConfig) -> Self {
        Self::new(config, Arc::new(MonotonicClock::new()), Arc::new(Unindexed))
    }

    /// Create an agent and register it with the spatial index.
    ///
    /// # Errors
    /// Returns `KennError::DuplicateAgent` if the id is already live.
    pub fn spawn(&self, builder: AgentBuilder) -> Result<Arc<Agent>> {
        let id = builder.id();
        let agent = match self.agents.entry(id) {
            Entry::Occupied(_) => return Err(KennError::DuplicateAgent(id)),
            Entry::Vacant(slot) => {
                let agent = builder.build(Arc::clone(&self.ctx));
                slot.insert(Arc::clone(&agent));
                agent
            }
        };
        self.spatial.register(&agent);
        debug!(agent = %id, name = %agent.name(), "Agent spawned");
        Ok(agent)
    }

    /// Look up a live agent.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<Arc<Agent>> {
        self.agents.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// Tear an agent down and drop it from the registry and spatial index.
    /// Returns the number of peers that were unlinked.
    ///
    /// # Errors
    /// Returns `KennError::AgentNotFound` if the id is not live.
    pub fn destroy(&self, id: AgentId) -> Result<usize> {
        let agent = self.get(id).ok_or(KennError::AgentNotFound(id))?;
        let unlinked = agent.destroy();
        self.spatial.deregister(id);
        self.agents.remove(&id);
        Ok(unlinked)
    }

    /// Snapshot of all live agents.
    #[must_use]
    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.agents.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Number of live agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no agents are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Run the pending-destruction sweep on every agent. Returns the total
    /// number of entries forgotten.
    pub fn sweep_all(&self) -> usize {
        self.agents().iter().map(|a| a.sweep().len()).sum()
    }

    /// Candidates near `observer` after filtering: same variation, not the
    /// observer itself, accepted by `filter`.
    #[must_use]
    pub fn candidates_near(&self, observer: &Agent, filter: CandidateFilter) -> Vec<Arc<Agent>> {
        let mut candidates = self.spatial.candidates_near(observer, filter);
        candidates.retain(|c| {
            c.id() != observer.id()
                && !c.is_torn_down()
                && c.variation() == observer.variation()
                && classify(observer.caps(), c.caps(), filter)
        });
        candidates
    }

    /// `candidates` narrowed to those `observer` could meet for the first
    /// time: already known, or within the clamp radius.
    #[must_use]
    pub fn clamp_filter(&self, observer: &Agent, candidates: &[Arc<Agent>]) -> Vec<Arc<Agent>> {
        candidates
            .iter()
            .filter(|c| {
                observer.interest().contains(Relation::Known, c.id())
                    || !observer.outside_clamp(c)
            })
            .cloned()
            .collect()
    }

    /// Shared clock, tuning and counters.
    #[must_use]
    pub fn context(&self) -> &Arc<InterestContext> {
        &self.ctx
    }

    /// Edge churn counters.
    #[must_use]
    pub fn counters(&self) -> &InterestCounters {
        &self.ctx.counters
    }

    /// The spatial index this world queries.
    #[must_use]
    pub fn spatial(&self) -> &Arc<dyn SpatialIndex> {
        &self.spatial
    }
}
