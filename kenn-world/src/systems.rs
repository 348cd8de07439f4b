//! Per-tick systems driving the interest core from the spatial index.
//!
//! ## System Budget (per tick):
//!
//! | System              | Runs for                | Frequency    |
//! |---------------------|-------------------------|--------------|
//! | Visibility          | players                 | Every tick   |
//! | Target acquisition  | monsters, combat pets   | Every tick   |
//! | Pending sweep       | every agent             | Every tick   |
//!
//! Agents are processed in parallel on a rayon pool. Each agent only ever
//! mutates through its own `&self` methods, so no ordering between agents
//! is required.

use std::collections::HashSet;
use std::ops::Add;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info_span, warn};

use kenn_core::metrics::{TickBudgetMonitor, spans};
use kenn_core::spatial::CandidateFilter;
use kenn_core::{Agent, Location, Relation, World};

use crate::config::WorldConfig;

/// What one tick changed, summed over all agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Agents processed.
    pub agents: usize,
    /// Agents newly promoted into some player's Known set.
    pub newly_known: usize,
    /// Agents that left visibility and were queued for destruction.
    pub queued: usize,
    /// Target edges accepted.
    pub targets_added: usize,
    /// Pending entries forgotten by the sweep.
    pub forgotten: usize,
}

impl Add for TickReport {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            agents: self.agents + rhs.agents,
            newly_known: self.newly_known + rhs.newly_known,
            queued: self.queued + rhs.queued,
            targets_added: self.targets_added + rhs.targets_added,
            forgotten: self.forgotten + rhs.forgotten,
        }
    }
}

/// Outcome of one visibility pass for a single observer.
#[derive(Debug, Default)]
pub struct VisibilityDelta {
    /// Agents the observer's client must be told to create.
    pub newly_known: Vec<Arc<Agent>>,
    /// Agents that dropped out of range this pass.
    pub queued: Vec<Arc<Agent>>,
}

/// Reconcile an observer's Visible set against the spatial index.
///
/// Candidates in range are added (first contacts subject to the clamp);
/// visible agents no longer in range are queued for delayed destruction.
pub fn update_visibility(world: &World, observer: &Agent) -> VisibilityDelta {
    let candidates = world.candidates_near(observer, CandidateFilter::All);
    let in_range: HashSet<_> = candidates.iter().map(|c| c.id()).collect();

    let newly_known = observer.add_visible_batch(&candidates);

    let departed: Vec<Arc<Agent>> = observer
        .snapshot(Relation::Visible)
        .into_iter()
        .filter(|a| !in_range.contains(&a.id()))
        .collect();
    let queued = observer.add_to_pending_destruction_batch(&departed);

    if !newly_known.is_empty() || !queued.is_empty() {
        debug!(
            observer = %observer.id(),
            candidates = candidates.len(),
            newly_known = newly_known.len(),
            queued = queued.len(),
            "Visibility reconciled"
        );
    }
    VisibilityDelta { newly_known, queued }
}

/// Offer nearby attack candidates to a monster or combat pet. Returns the
/// accepted targets.
pub fn update_targets(world: &World, agent: &Agent) -> Vec<Arc<Agent>> {
    let candidates = world.candidates_near(agent, CandidateFilter::AttackTargets);
    agent.add_targets(&candidates)
}

fn tick_agent(world: &World, agent: &Agent, update_targets_enabled: bool) -> TickReport {
    let mut report = TickReport {
        agents: 1,
        ..TickReport::default()
    };
    if agent.is_torn_down() {
        return report;
    }
    let _span = info_span!(spans::RECONCILE, agent = %agent.id()).entered();

    if agent.is_player() {
        let delta = update_visibility(world, agent);
        report.newly_known = delta.newly_known.len();
        report.queued = delta.queued.len();
    }
    let caps = agent.caps();
    if update_targets_enabled && !caps.is_static && (caps.is_monster || caps.is_combat_pet) {
        report.targets_added = update_targets(world, agent).len();
    }
    report.forgotten = agent.sweep().len();
    report
}

/// Run one tick over every live agent.
///
/// With a pool the agents are processed inside it; otherwise on rayon's
/// global pool.
pub fn run_tick(world: &World, pool: Option<&rayon::ThreadPool>, update_targets: bool) -> TickReport {
    let agents = world.agents();
    let _span = info_span!(spans::TICK, agents = agents.len()).entered();

    let work = || {
        agents
            .par_iter()
            .map(|agent| tick_agent(world, agent, update_targets))
            .reduce(TickReport::default, Add::add)
    };
    match pool {
        Some(pool) => pool.install(work),
        None => work(),
    }
}

/// Move an agent and re-bucket it in the spatial index.
pub fn relocate(world: &World, agent: &Arc<Agent>, location: Location) {
    agent.set_location(location);
    world.spatial().relocate(agent);
}

/// Owns the per-tick scheduling state: worker pool and timing history.
pub struct Ticker {
    pool: Option<rayon::ThreadPool>,
    monitor: TickBudgetMonitor,
    update_targets: bool,
}

impl Ticker {
    /// Build from configuration. A dedicated pool is created when
    /// `tick.worker_threads > 0`; if that fails the global pool is used.
    #[must_use]
    pub fn new(config: &WorldConfig) -> Self {
        let pool = if config.tick.worker_threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.tick.worker_threads)
                .thread_name(|i| format!("kenn-tick-{i}"))
                .build()
                .map_err(|e| warn!(error = %e, "Tick pool unavailable, using global pool"))
                .ok()
        } else {
            None
        };
        Self {
            pool,
            monitor: TickBudgetMonitor::new(config.core.telemetry.log_slow_ticks_ms),
            update_targets: config.tick.update_targets,
        }
    }

    /// Run one tick and record its duration.
    pub fn tick(&self, world: &World) -> TickReport {
        let started = Instant::now();
        let report = run_tick(world, self.pool.as_ref(), self.update_targets);
        if self.monitor.record(started.elapsed()) {
            warn!(
                elapsed_ms = self.monitor.last_ms(),
                budget_ms = self.monitor.budget_ms(),
                worst_ms = self.monitor.worst_ms(),
                agents = report.agents,
                "Slow interest tick"
            );
        }
        report
    }

    /// Timing history of past ticks.
    #[must_use]
    pub fn monitor(&self) -> &TickBudgetMonitor {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridIndex;
    use kenn_core::spatial::SpatialIndex;
    use kenn_core::{AgentBuilder, AgentId, Capabilities, InterestConfig, ManualClock};

    struct Harness {
        clock: Arc<ManualClock>,
        world: World,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::starting_at(0.0));
        let world = World::new(
            InterestConfig::default(),
            Arc::clone(&clock) as Arc<dyn kenn_core::Clock>,
            Arc::new(GridIndex::new(192.0)) as Arc<dyn SpatialIndex>,
        );
        Harness { clock, world }
    }

    fn spawn(world: &World, id: u32, caps: Capabilities, x: f32) -> Arc<Agent> {
        world
            .spawn(
                AgentBuilder::new(AgentId(id))
                    .caps(caps)
                    .location(Location::new(x, 0.0, 0.0)),
            )
            .expect("spawn")
    }

    #[test]
    fn visibility_follows_movement() {
        let h = harness();
        let player = spawn(&h.world, 1, Capabilities::player(), 0.0);
        let drudge = spawn(&h.world, 2, Capabilities::monster(None), 50.0);

        let delta = update_visibility(&h.world, &player);
        assert_eq!(delta.newly_known.len(), 1);
        assert!(player.contains(Relation::Visible, drudge.id()));
        assert!(drudge.contains(Relation::Targets, player.id()));

        relocate(&h.world, &drudge, Location::new(2_000.0, 0.0, 0.0));
        let delta = update_visibility(&h.world, &player);
        assert_eq!(delta.queued.len(), 1);
        assert!(player.contains(Relation::PendingDestruction, drudge.id()));
        assert!(!drudge.contains(Relation::Targets, player.id()));

        h.clock.advance(25.0);
        let report = run_tick(&h.world, None, true);
        assert_eq!(report.forgotten, 1);
        assert!(!player.contains(Relation::Known, drudge.id()));
    }

    #[test]
    fn first_contact_beyond_clamp_waits_until_closer() {
        let h = harness();
        let player = spawn(&h.world, 1, Capabilities::player(), 0.0);
        let far = spawn(&h.world, 2, Capabilities::default(), 150.0);

        assert!(update_visibility(&h.world, &player).newly_known.is_empty());
        relocate(&h.world, &far, Location::new(100.0, 0.0, 0.0));
        assert_eq!(update_visibility(&h.world, &player).newly_known.len(), 1);
    }

    #[test]
    fn pets_acquire_nearby_monsters() {
        let h = harness();
        let pet = spawn(&h.world, 1, Capabilities::combat_pet(), 0.0);
        let drudge = spawn(&h.world, 2, Capabilities::monster(None), 20.0);
        spawn(&h.world, 3, Capabilities::player(), 10.0);

        let accepted = update_targets(&h.world, &pet);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id(), drudge.id());
        assert!(drudge.contains(Relation::Targets, pet.id()));
    }

    #[test]
    fn tick_report_sums_agents() {
        let h = harness();
        spawn(&h.world, 1, Capabilities::player(), 0.0);
        spawn(&h.world, 2, Capabilities::player(), 5.0);
        spawn(&h.world, 3, Capabilities::monster(None), 10.0);

        let ticker = Ticker::new(&WorldConfig::default());
        let report = ticker.tick(&h.world);
        assert_eq!(report.agents, 3);
        assert_eq!(report.newly_known, 4);
        assert_eq!(ticker.monitor().ticks(), 1);

        let again = ticker.tick(&h.world);
        assert_eq!(again.newly_known, 0);
        assert_eq!(again.queued, 0);
    }
}
