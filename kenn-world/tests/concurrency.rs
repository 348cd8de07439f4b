//! Concurrency Tests — parallel mutation of shared interest sets.
//!
//! The same operations issued from many rayon workers at once, in random
//! order, must leave the graph exactly as a sequential run would.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rayon::prelude::*;

use kenn_core::{
    Agent, AgentBuilder, AgentId, Capabilities, Clock, Location, ManualClock, Relation, World,
};
use kenn_world::{WorldConfig, build_world_with_clock, systems};

fn world() -> (Arc<ManualClock>, World) {
    kenn_world::logging::init(&WorldConfig::default().core.general);
    let clock = Arc::new(ManualClock::starting_at(0.0));
    let world = build_world_with_clock(&WorldConfig::default(), Arc::clone(&clock) as Arc<dyn Clock>);
    (clock, world)
}

fn populate(world: &World, players: u32, monsters: u32, seed: u64) -> Vec<Arc<Agent>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::new();
    for i in 0..players + monsters {
        let caps = if i < players {
            Capabilities::player()
        } else {
            Capabilities::monster(None)
        };
        let location = Location::new(rng.gen_range(0.0..70.0), rng.gen_range(0.0..70.0), 0.0);
        out.push(
            world
                .spawn(AgentBuilder::new(AgentId(i)).caps(caps).location(location))
                .expect("unique id"),
        );
    }
    out
}

#[test]
fn parallel_visibility_converges() {
    let (_clock, world) = world();
    let agents = populate(&world, 12, 12, 7);

    let mut pairs: Vec<(usize, usize)> = (0..agents.len())
        .flat_map(|a| (0..agents.len()).map(move |b| (a, b)))
        .filter(|(a, b)| a != b)
        .collect();
    // every pair four times, shuffled
    let mut ops: Vec<(usize, usize)> = pairs.iter().copied().cycle().take(pairs.len() * 4).collect();
    ops.shuffle(&mut StdRng::seed_from_u64(11));
    pairs.sort_unstable();

    ops.par_iter().for_each(|&(a, b)| {
        agents[a].add_visible(&agents[b]);
    });

    for (a, b) in pairs {
        let (a, b) = (&agents[a], &agents[b]);
        assert!(a.contains(Relation::Visible, b.id()));
        assert!(a.contains(Relation::Known, b.id()));
        assert_eq!(b.contains(Relation::KnownObservers, a.id()), a.is_player());
        let monster_sees_player = b.caps().is_monster && a.is_player();
        if monster_sees_player {
            assert!(b.contains(Relation::Targets, a.id()));
        }
    }
}

#[test]
fn teardown_racing_inserts_leaves_no_dangling_edges() {
    let (_clock, world) = world();
    let agents = populate(&world, 8, 8, 3);
    let victims: Vec<AgentId> = agents.iter().step_by(3).map(|a| a.id()).collect();

    let mut rng = StdRng::seed_from_u64(5);
    let ops: Vec<(usize, usize, u8)> = (0..4_000)
        .map(|_| {
            (
                rng.gen_range(0..agents.len()),
                rng.gen_range(0..agents.len()),
                rng.gen_range(0..4),
            )
        })
        .collect();

    rayon::join(
        || {
            ops.par_iter().for_each(|&(a, b, kind)| {
                let (a, b) = (&agents[a], &agents[b]);
                match kind {
                    0 => {
                        a.add_visible(b);
                    }
                    1 => {
                        a.add_target(b, false, false);
                    }
                    2 => {
                        a.add_retaliate_target(b);
                    }
                    _ => {
                        a.add_to_pending_destruction(b);
                    }
                }
            });
        },
        || {
            victims.par_iter().for_each(|id| {
                world.destroy(*id).expect("victim is live");
            });
        },
    );

    for agent in &agents {
        if victims.contains(&agent.id()) {
            assert!(agent.interest().is_empty(), "{} kept edges", agent.id());
            continue;
        }
        for relation in Relation::ALL {
            for id in &victims {
                assert!(
                    !agent.contains(relation, *id),
                    "{} still references {id} in {relation}",
                    agent.id()
                );
            }
        }
    }
}

#[test]
fn expired_entries_cannot_be_cancelled_during_sweep() {
    let (clock, world) = world();
    let agents = populate(&world, 1, 64, 9);
    let player = &agents[0];
    let others = &agents[1..];

    for other in others {
        player.add_visible(other);
        player.add_to_pending_destruction(other);
    }
    clock.advance(25.0);

    let (cancelled, swept) = rayon::join(
        || {
            others
                .par_iter()
                .filter(|o| player.remove_from_pending_destruction(o))
                .count()
        },
        || player.sweep().len(),
    );

    // the grace period is over, so only the sweep can claim entries
    assert_eq!(cancelled, 0);
    assert_eq!(swept, others.len());
    assert_eq!(player.count(Relation::PendingDestruction), 0);
}

#[test]
fn reentry_racing_sweep_keeps_agents_inside_grace() {
    let (clock, world) = world();
    let agents = populate(&world, 1, 64, 13);
    let player = &agents[0];
    let (expired, in_grace) = agents[1..].split_at(32);

    for other in &agents[1..] {
        player.add_visible(other);
    }
    // first half due at 25s, second half at 35s
    for other in expired {
        player.add_to_pending_destruction(other);
    }
    clock.advance(10.0);
    for other in in_grace {
        player.add_to_pending_destruction(other);
    }
    clock.advance(20.0);
    let before = world.counters().snapshot();

    let (newly_known, swept) = rayon::join(
        || player.add_visible_batch(&agents[1..]),
        || player.sweep(),
    );

    for other in in_grace {
        assert!(player.contains(Relation::Visible, other.id()), "{} lost", other.id());
        assert!(player.contains(Relation::Known, other.id()));
        assert!(!newly_known.iter().any(|a| a.id() == other.id()));
        assert!(!swept.iter().any(|a| a.id() == other.id()), "{} swept", other.id());
    }
    for agent in &swept {
        assert!(expired.iter().any(|e| e.id() == agent.id()));
    }
    assert_eq!(player.count(Relation::PendingDestruction), 0);

    let after = world.counters().snapshot();
    assert_eq!(after.pending_cancelled - before.pending_cancelled, in_grace.len() as u64);
    assert_eq!(after.pending_expired - before.pending_expired, expired.len() as u64);
}

#[test]
fn racing_batches_report_each_agent_newly_known_once() {
    let (_clock, world) = world();
    let agents = populate(&world, 8, 24, 21);
    let (players, others) = agents.split_at(8);

    for player in players {
        let reports: Vec<Vec<Arc<Agent>>> = (0..6)
            .into_par_iter()
            .map(|_| player.add_visible_batch(others))
            .collect();

        let mut reported: Vec<AgentId> = reports.iter().flatten().map(|a| a.id()).collect();
        reported.sort_unstable();
        let mut expected: Vec<AgentId> = others.iter().map(|a| a.id()).collect();
        expected.sort_unstable();
        assert_eq!(reported, expected, "{} lost or doubled a create", player.id());
    }
}

#[test]
fn parallel_tick_matches_sequential_tick() {
    let (_c1, parallel) = world();
    let (_c2, sequential) = world();
    populate(&parallel, 10, 20, 42);
    populate(&sequential, 10, 20, 42);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .expect("single-thread pool");

    let a = systems::run_tick(&parallel, None, false);
    let b = systems::run_tick(&sequential, Some(&pool), false);
    assert_eq!(a, b);

    for agent in parallel.agents() {
        let twin = sequential.get(agent.id()).expect("same ids");
        assert_eq!(agent.summary(), twin.summary(), "{}", agent.id());
    }
}
