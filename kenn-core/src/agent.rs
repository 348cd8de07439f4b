//! Agents and the edge-reconciliation rules between them.
//!
//! Every mutation takes `&self` and the peer by reference and may touch
//! both agents' [`InterestSet`]s. Nothing here ever locks two agents: each
//! collection is independently concurrent and every insert is
//! test-and-set, so racing threads converge on the same graph.
//!
//! Rejected edges are not errors. The method returns `false` and logs the
//! [`Violation`] at debug level.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::classifier::{TargetVerdict, target_verdict};
use crate::clock::Clock;
use crate::config::InterestConfig;
use crate::error::Violation;
use crate::interest::{EdgeMap, InterestSet, Link, Relation, insert_edge};
use crate::metrics::InterestCounters;
use crate::types::{AgentId, Capabilities, Location, Timestamp, Variation};

/// State shared by every agent of one world: clock, tuning and counters.
pub struct InterestContext {
    /// Time source for grace-period deadlines.
    pub clock: Arc<dyn Clock>,
    /// Clamp and destruction tuning.
    pub config: InterestConfig,
    /// Edge churn counters.
    pub counters: InterestCounters,
}

impl InterestContext {
    /// Bundle a clock and configuration.
    #[must_use]
    pub fn new(config: InterestConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            config,
            counters: InterestCounters::new(),
        }
    }

    /// Current time.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

impl fmt::Debug for InterestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterestContext")
            .field("now", &self.clock.now())
            .field("config", &self.config)
            .field("counters", &self.counters)
            .finish()
    }
}

/// Construction parameters for an [`Agent`].
#[derive(Debug, Clone)]
pub struct AgentBuilder {
    id: AgentId,
    name: String,
    variation: Option<Variation>,
    caps: Capabilities,
    location: Location,
}

impl AgentBuilder {
    /// Start building an agent with the given id.
    #[must_use]
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            name: id.to_string(),
            variation: None,
            caps: Capabilities::default(),
            location: Location::default(),
        }
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// World-instance tag.
    #[must_use]
    pub fn variation(mut self, variation: Option<Variation>) -> Self {
        self.variation = variation;
        self
    }

    /// Capability flags.
    #[must_use]
    pub fn caps(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Initial position.
    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// The id this builder will produce.
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Materialise the agent. Its interest set starts empty.
    #[must_use]
    pub fn build(self, ctx: Arc<InterestContext>) -> Arc<Agent> {
        Arc::new_cyclic(|me| Agent {
            id: self.id,
            name: self.name,
            variation: self.variation,
            caps: self.caps,
            location: RwLock::new(self.location),
            interest: InterestSet::new(),
            torn_down: AtomicBool::new(false),
            me: me.clone(),
            ctx,
        })
    }
}

/// What a single visibility insert changed.
#[derive(Debug, Clone, Copy, Default)]
struct VisibleInsert {
    visible: bool,
    newly_known: bool,
}

/// A tracked simulated entity and its interest set.
pub struct Agent {
    id: AgentId,
    name: String,
    variation: Option<Variation>,
    caps: Capabilities,
    location: RwLock<Location>,
    pub(crate) interest: InterestSet,
    torn_down: AtomicBool,
    me: Weak<Agent>,
    pub(crate) ctx: Arc<InterestContext>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("variation", &self.variation)
            .field("caps", &self.caps)
            .field("location", &*self.location.read())
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Stable id.
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World-instance tag.
    #[must_use]
    pub fn variation(&self) -> Option<Variation> {
        self.variation
    }

    /// Capability flags.
    #[must_use]
    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    /// Whether this agent is a player avatar.
    #[must_use]
    pub fn is_player(&self) -> bool {
        self.caps.is_player
    }

    /// Snapshot of the current position.
    #[must_use]
    pub fn location(&self) -> Location {
        *self.location.read()
    }

    /// Overwrite the position. Called by the movement simulation.
    pub fn set_location(&self, location: Location) {
        *self.location.write() = location;
    }

    /// Read access to the raw collections.
    #[must_use]
    pub fn interest(&self) -> &InterestSet {
        &self.interest
    }

    /// Whether [`Agent::destroy`] has started for this agent.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_torn_down(&self) -> bool {
        !self.torn_down.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn handle(&self) -> &Weak<Agent> {
        &self.me
    }

    // -----------------------------------------------------------------------
    // Edge plumbing
    // -----------------------------------------------------------------------

    /// Insert `peer` into one of this agent's edge maps and record this
    /// agent as a referrer of `peer`.
    ///
    /// A teardown of either side that races the insert is detected after
    /// the referrer entry is written; the edge is then undone.
    pub(crate) fn link(&self, map: &EdgeMap, peer: &Agent) -> Link {
        if !insert_edge(map, peer.id, peer.handle()) {
            return Link::Present;
        }
        peer.interest.referrers.insert(self.id, self.me.clone());
        if self.is_torn_down() || peer.is_torn_down() {
            map.remove(&peer.id);
            return Link::Refused;
        }
        InterestCounters::bump(&self.ctx.counters.edges_added);
        Link::Inserted
    }

    /// Common admission checks for any edge between `self` and `peer`.
    pub(crate) fn admit(&self, peer: &Agent) -> Result<(), Violation> {
        if self.id == peer.id {
            return Err(Violation::SelfReference);
        }
        if self.is_torn_down() || peer.is_torn_down() {
            return Err(Violation::TornDown);
        }
        if self.variation != peer.variation {
            return Err(Violation::VariationMismatch);
        }
        Ok(())
    }

    pub(crate) fn reject(&self, edge: &'static str, peer: &Agent, violation: Violation) {
        InterestCounters::bump(&self.ctx.counters.edges_rejected);
        debug!(
            owner = %self.id,
            owner_name = %self.name,
            peer = %peer.id,
            peer_name = %peer.name,
            edge,
            %violation,
            "Edge rejected"
        );
    }

    /// First contact: neither side has the other in its known set.
    fn first_contact_with(&self, peer: &Agent) -> bool {
        !self.interest.known.contains_key(&peer.id) && !peer.interest.known.contains_key(&self.id)
    }

    /// Whether `peer` lies beyond the initial clamp radius.
    pub(crate) fn outside_clamp(&self, peer: &Agent) -> bool {
        let config = &self.ctx.config;
        if !config.initial_clamp {
            return false;
        }
        self.location().distance_2d_squared(&peer.location()) > config.clamp_distance_sq()
    }

    // -----------------------------------------------------------------------
    // Known
    // -----------------------------------------------------------------------

    /// Add `obj` to the known set.
    ///
    /// Returns `true` if `obj` was previously unknown. When this agent is a
    /// player, it is also recorded in `obj`'s known observers.
    pub fn add_known(&self, obj: &Agent) -> bool {
        if let Err(violation) = self.admit(obj) {
            self.reject("known", obj, violation);
            return false;
        }
        match self.promote_known(obj) {
            Link::Inserted => true,
            Link::Present => {
                trace!(owner = %self.id, peer = %obj.id, "Already known");
                false
            }
            Link::Refused => false,
        }
    }

    /// Link `obj` into Known together with the observer back-edge a player
    /// owes it. Static scenery is refused up front; if `obj` still refuses
    /// the observer (a racing teardown) the Known edge is undone.
    fn promote_known(&self, obj: &Agent) -> Link {
        if self.caps.is_player && obj.caps.is_static {
            self.reject("known", obj, Violation::StaticObject);
            return Link::Refused;
        }
        let link = self.link(&self.interest.known, obj);
        if link == Link::Inserted
            && self.caps.is_player
            && obj.add_known_observer(self) == Link::Refused
        {
            self.interest.known.remove(&obj.id);
            return Link::Refused;
        }
        link
    }

    /// Forget `obj`. With `invert_observer`, also drop this agent from
    /// `obj`'s known observers.
    ///
    /// `obj` leaves Visible and PendingDestruction first, so Visible stays
    /// a subset of Known throughout.
    pub fn remove_known(&self, obj: &Agent, invert_observer: bool) -> bool {
        self.remove_visible(obj, invert_observer);
        self.interest.pending.remove(&obj.id);
        let removed = self.interest.known.remove(&obj.id).is_some();
        if invert_observer && self.caps.is_player {
            obj.remove_known_observer(self.id);
        }
        removed
    }

    /// Record `observer` as a player who knows about this agent.
    pub(crate) fn add_known_observer(&self, observer: &Agent) -> Link {
        let admitted = if observer.caps.is_player {
            if self.caps.is_static {
                Err(Violation::StaticObject)
            } else {
                self.admit(observer)
            }
        } else {
            Err(Violation::NonPlayerObserver)
        };
        if let Err(violation) = admitted {
            self.reject("known_observer", observer, violation);
            return Link::Refused;
        }
        self.link(&self.interest.observers, observer)
    }

    pub(crate) fn remove_known_observer(&self, id: AgentId) -> bool {
        self.interest.observers.remove(&id).is_some()
    }

    // -----------------------------------------------------------------------
    // Visible
    // -----------------------------------------------------------------------

    /// Mark `obj` as currently perceivable.
    ///
    /// Returns `true` if `obj` was not visible before. A first contact
    /// (`obj` not yet known) beyond the clamp radius is refused, so newly
    /// spawned agents are not flooded before the spatial pass prunes their
    /// candidates. Re-entry of an already known agent is never clamped.
    ///
    /// When `obj` is a monster, it gains this agent as a target.
    pub fn add_visible(&self, obj: &Agent) -> bool {
        self.insert_visible(obj).visible
    }

    /// Shared body of [`Agent::add_visible`] and the batch form.
    fn insert_visible(&self, obj: &Agent) -> VisibleInsert {
        if let Err(violation) = self.admit(obj) {
            self.reject("visible", obj, violation);
            return VisibleInsert::default();
        }
        if self.interest.visible.contains_key(&obj.id) {
            trace!(owner = %self.id, peer = %obj.id, "Already visible");
            return VisibleInsert::default();
        }

        // a pending entry is either cancelled (still in grace) or, once
        // expired, forgotten exactly as the sweep would
        if self.interest.pending.contains_key(&obj.id)
            && !self.remove_from_pending_destruction(obj)
            && self.claim_expired(obj.id, self.ctx.now()).is_some()
        {
            InterestCounters::bump(&self.ctx.counters.pending_expired);
            self.remove(obj, true);
        }

        let first_contact = !self.interest.known.contains_key(&obj.id);
        if first_contact && self.outside_clamp(obj) {
            self.reject("visible", obj, Violation::OutsideClamp);
            return VisibleInsert::default();
        }

        let known = self.promote_known(obj);
        if known == Link::Refused {
            return VisibleInsert::default();
        }
        // whoever promoted into Known reports it, even if a racing caller
        // won the Visible insert
        let newly_known = known == Link::Inserted;
        match self.link(&self.interest.visible, obj) {
            Link::Inserted => {}
            Link::Present => {
                return VisibleInsert {
                    visible: false,
                    newly_known,
                };
            }
            Link::Refused => return VisibleInsert::default(),
        }

        if obj.caps.is_monster {
            obj.add_target(self, false, false);
        }
        VisibleInsert {
            visible: true,
            newly_known,
        }
    }

    /// Reconcile a batch of currently visible agents.
    ///
    /// Each is passed through [`Agent::add_visible`]; afterwards any of them
    /// still queued for destruction is cancelled. Returns the agents that
    /// were newly promoted into Known, i.e. the ones the owner's client
    /// has to be told about.
    pub fn add_visible_batch(&self, objs: &[Arc<Agent>]) -> Vec<Arc<Agent>> {
        let mut newly_known = Vec::new();
        for obj in objs {
            if self.insert_visible(obj).newly_known {
                newly_known.push(Arc::clone(obj));
            }
        }
        for obj in objs {
            self.remove_from_pending_destruction(obj);
        }
        newly_known
    }

    /// Drop `obj` from Visible. With `invert_target`, also drop this agent
    /// from `obj`'s targets.
    pub fn remove_visible(&self, obj: &Agent, invert_target: bool) -> bool {
        let removed = self.interest.visible.remove(&obj.id).is_some();
        if invert_target {
            obj.remove_target(self.id);
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Targets
    // -----------------------------------------------------------------------

    /// Consider `obj` as a combat target.
    ///
    /// The classifier decides. A rejected candidate leaves no edge. An
    /// inverted one is handed to `obj` (`obj` evaluates this agent, with
    /// `via_foe_type` set so the hand-off is never inverted back) and the
    /// forward edge is reported as not added. An accepted one is subject
    /// to the first-contact clamp when `clamp` is set; a non-player `obj`
    /// then gets the reciprocal edge.
    pub fn add_target(&self, obj: &Agent, clamp: bool, via_foe_type: bool) -> bool {
        if let Err(violation) = self.admit(obj) {
            self.reject("target", obj, violation);
            return false;
        }

        match target_verdict(&self.caps, &obj.caps) {
            TargetVerdict::Reject(violation) => {
                self.reject("target", obj, violation);
                false
            }
            TargetVerdict::Invert => {
                if via_foe_type {
                    trace!(owner = %self.id, peer = %obj.id, "Inversion hand-off not re-inverted");
                    return false;
                }
                InterestCounters::bump(&self.ctx.counters.inversions);
                trace!(owner = %self.id, peer = %obj.id, "Target inverted onto candidate");
                obj.add_target(self, clamp, true);
                false
            }
            TargetVerdict::Accept => {
                if clamp && self.first_contact_with(obj) && self.outside_clamp(obj) {
                    self.reject("target", obj, Violation::OutsideClamp);
                    return false;
                }
                if self.link(&self.interest.targets, obj) != Link::Inserted {
                    return false;
                }
                if !obj.caps.is_player {
                    obj.add_target(self, clamp, via_foe_type);
                }
                true
            }
        }
    }

    /// Run [`Agent::add_target`] (clamped) over a batch; returns the accepted.
    pub fn add_targets(&self, objs: &[Arc<Agent>]) -> Vec<Arc<Agent>> {
        objs.iter()
            .filter(|obj| self.add_target(obj, true, false))
            .cloned()
            .collect()
    }

    /// Drop a target edge. Provoked targets survive until
    /// [`Agent::clear_retaliate_targets`] or a full removal.
    pub(crate) fn remove_target(&self, id: AgentId) -> bool {
        if self.interest.retaliate.contains_key(&id) {
            return false;
        }
        self.interest.targets.remove(&id).is_some()
    }

    /// Provocation override: make `obj` a target regardless of policy.
    ///
    /// Variation and liveness still apply. Returns `true` if `obj` was not
    /// already a retaliate target.
    pub fn add_retaliate_target(&self, obj: &Agent) -> bool {
        let admitted = if self.caps.is_static {
            Err(Violation::StaticObject)
        } else {
            self.admit(obj)
        };
        if let Err(violation) = admitted {
            self.reject("retaliate_target", obj, violation);
            return false;
        }

        if self.link(&self.interest.targets, obj) == Link::Refused {
            return false;
        }
        let added = self.link(&self.interest.retaliate, obj) == Link::Inserted;
        // a concurrent remove_target may have dropped the target in between
        if added && self.link(&self.interest.targets, obj) == Link::Refused {
            self.interest.retaliate.remove(&obj.id);
            return false;
        }
        added
    }

    /// Forget every provoked target (the monster went back to sleep).
    /// Returns how many were cleared.
    pub fn clear_retaliate_targets(&self) -> usize {
        let mut cleared = 0;
        for id in self.interest.ids(Relation::RetaliateTargets) {
            if self.interest.retaliate.remove(&id).is_some() {
                self.interest.targets.remove(&id);
                cleared += 1;
            }
        }
        cleared
    }

    // -----------------------------------------------------------------------
    // Full removal
    // -----------------------------------------------------------------------

    /// Remove `obj` from all six collections. With `invert`, also remove the
    /// observer and target back-edges `obj` holds to this agent.
    ///
    /// A KnownObservers entry mirrors `obj`'s own Known set, so it is kept
    /// while `obj` is alive and still knows this agent.
    pub fn remove(&self, obj: &Agent, invert: bool) {
        let still_observed = !obj.is_torn_down() && obj.interest.known.contains_key(&self.id);
        if !still_observed {
            obj.interest.referrers.remove(&self.id);
        }
        self.remove_known(obj, invert);
        self.remove_visible(obj, invert);
        self.interest.pending.remove(&obj.id);
        self.interest.retaliate.remove(&obj.id);
        self.interest.targets.remove(&obj.id);
        if !still_observed {
            self.interest.observers.remove(&obj.id);
        }
    }

    /// Drop every edge keyed by `id`, even if its handle is dead.
    pub(crate) fn purge_id(&self, id: AgentId) {
        self.interest.visible.remove(&id);
        self.interest.known.remove(&id);
        self.interest.pending.remove(&id);
        self.interest.observers.remove(&id);
        self.interest.retaliate.remove(&id);
        self.interest.targets.remove(&id);
    }
}
