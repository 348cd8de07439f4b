//! Teardown: unlink a departing agent from every peer.
//!
//! The agent is flagged first. Any insert that races the teardown sees the
//! flag after writing its edge and takes the edge back out, so once the
//! dust settles no collection anywhere still names the agent.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info_span};

use crate::agent::Agent;
use crate::interest::Relation;
use crate::metrics::{InterestCounters, spans};
use crate::types::AgentId;

impl Agent {
    /// Tear this agent down.
    ///
    /// Every peer reachable through its own collections or its referrer
    /// index forgets it, then all of its collections are emptied. Returns
    /// the number of peers that were unlinked; a second call returns 0.
    pub fn destroy(&self) -> usize {
        if !self.mark_torn_down() {
            return 0;
        }
        let _span = info_span!(spans::TEARDOWN, agent = %self.id()).entered();

        let peers = self.linked_peers();
        for peer in peers.values() {
            peer.remove(self, false);
        }
        self.interest.clear();

        InterestCounters::bump(&self.ctx.counters.teardowns);
        debug!(
            agent = %self.id(),
            name = %self.name(),
            peers = peers.len(),
            "Agent torn down"
        );
        peers.len()
    }

    /// Every live peer that this agent references or that references it.
    fn linked_peers(&self) -> HashMap<AgentId, Arc<Agent>> {
        let mut peers = HashMap::new();
        for relation in Relation::ALL {
            for peer in self.interest.peers(relation) {
                peers.insert(peer.id(), peer);
            }
        }
        for peer in self.interest.referrer_peers() {
            peers.insert(peer.id(), peer);
        }
        peers.remove(&self.id());
        peers
    }
}
