//! Uniform-grid broad phase.
//!
//! Agents are bucketed by `(variation, cell_x, cell_y)`. A query returns
//! everything in the 3x3 block of cells around the observer, so agents of
//! other variations are never even looked at.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::trace;

use kenn_core::spatial::{CandidateFilter, SpatialIndex};
use kenn_core::{Agent, AgentId, Location, Variation};

/// Bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    /// World instance.
    pub variation: Option<Variation>,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

/// Spatial hash over the ground plane.
#[derive(Debug)]
pub struct GridIndex {
    cell_size: f32,
    inv_cell_size: f32,
    cells: DashMap<CellKey, HashMap<AgentId, Weak<Agent>>>,
    placement: DashMap<AgentId, CellKey>,
}

impl GridIndex {
    /// Create an empty grid. `cell_size` must be positive.
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: DashMap::new(),
            placement: DashMap::new(),
        }
    }

    /// Side length of one cell.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// The cell a position falls into.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell_of(&self, variation: Option<Variation>, location: &Location) -> CellKey {
        CellKey {
            variation,
            x: (location.x * self.inv_cell_size).floor() as i32,
            y: (location.y * self.inv_cell_size).floor() as i32,
        }
    }

    /// Number of tracked agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placement.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placement.is_empty()
    }

    /// Re-bucket an agent after it moved. Returns `true` if it changed cell.
    pub fn update(&self, agent: &Arc<Agent>) -> bool {
        let key = self.cell_of(agent.variation(), &agent.location());
        let previous = self.placement.insert(agent.id(), key);
        if previous == Some(key) {
            return false;
        }
        if let Some(old) = previous {
            self.remove_from_cell(old, agent.id());
        }
        self.cells
            .entry(key)
            .or_default()
            .insert(agent.id(), Arc::downgrade(agent));
        trace!(agent = %agent.id(), cell_x = key.x, cell_y = key.y, "Agent re-bucketed");
        true
    }

    fn remove_from_cell(&self, key: CellKey, id: AgentId) {
        self.cells.remove_if_mut(&key, |_, bucket| {
            bucket.remove(&id);
            bucket.is_empty()
        });
    }
}

impl SpatialIndex for GridIndex {
    fn candidates_near(&self, observer: &Agent, filter: CandidateFilter) -> Vec<Arc<Agent>> {
        let center = self.cell_of(observer.variation(), &observer.location());
        let mut out = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                let key = CellKey {
                    x: center.x + dx,
                    y: center.y + dy,
                    ..center
                };
                if let Some(bucket) = self.cells.get(&key) {
                    out.extend(bucket.values().filter_map(Weak::upgrade));
                }
            }
        }
        if filter == CandidateFilter::Players {
            out.retain(|a| a.is_player());
        }
        out
    }

    fn register(&self, agent: &Arc<Agent>) {
        self.update(agent);
    }

    fn deregister(&self, id: AgentId) {
        if let Some((_, key)) = self.placement.remove(&id) {
            self.remove_from_cell(key, id);
        }
    }

    fn relocate(&self, agent: &Arc<Agent>) {
        self.update(agent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kenn_core::{AgentBuilder, Capabilities, InterestConfig, World};

    fn world_with_grid() -> (World, Arc<GridIndex>) {
        let grid = Arc::new(GridIndex::new(100.0));
        let world = World::new(
            InterestConfig::default(),
            Arc::new(kenn_core::ManualClock::default()),
            Arc::clone(&grid) as Arc<dyn SpatialIndex>,
        );
        (world, grid)
    }

    fn spawn(world: &World, id: u32, x: f32, y: f32, variation: Option<Variation>) -> Arc<Agent> {
        world
            .spawn(
                AgentBuilder::new(AgentId(id))
                    .caps(Capabilities::player())
                    .variation(variation)
                    .location(Location::new(x, y, 0.0)),
            )
            .expect("spawn")
    }

    #[test]
    fn neighbourhood_is_three_by_three() {
        let (world, grid) = world_with_grid();
        let observer = spawn(&world, 1, 50.0, 50.0, None);
        spawn(&world, 2, 150.0, -50.0, None);
        spawn(&world, 3, 250.0, 50.0, None);
        spawn(&world, 4, 60.0, 60.0, Some(Variation(2)));

        let mut ids: Vec<_> = grid
            .candidates_near(&observer, CandidateFilter::All)
            .iter()
            .map(|a| a.id().0)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn moving_updates_the_bucket() {
        let (world, grid) = world_with_grid();
        let observer = spawn(&world, 1, 0.0, 0.0, None);
        let walker = spawn(&world, 2, 500.0, 0.0, None);
        assert_eq!(grid.candidates_near(&observer, CandidateFilter::All).len(), 1);

        walker.set_location(Location::new(10.0, 0.0, 0.0));
        assert!(grid.update(&walker));
        assert!(!grid.update(&walker));
        assert_eq!(grid.candidates_near(&observer, CandidateFilter::All).len(), 2);
    }

    #[test]
    fn deregister_empties_cells() {
        let (world, grid) = world_with_grid();
        let agent = spawn(&world, 1, 0.0, 0.0, None);
        assert_eq!(grid.len(), 1);
        world.destroy(agent.id()).expect("live");
        assert!(grid.is_empty());
        assert!(grid.cells.is_empty());
    }
}
