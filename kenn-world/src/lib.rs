//! # kenn-world — Host Integration for KENN
//!
//! This crate wires the game-agnostic `kenn-core` interest sets to a
//! running simulation: a broad-phase spatial index, the per-tick systems
//! that feed it into the core, and the logging/configuration a server
//! process needs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              Host simulation             │
//! │  ┌────────────────────────────────────┐  │
//! │  │           kenn-world               │  │
//! │  │  ┌─────────────┐  ┌─────────────┐  │  │
//! │  │  │  GridIndex  │  │   Systems   │  │  │
//! │  │  └──────┬──────┘  └──────┬──────┘  │  │
//! │  │         │                │         │  │
//! │  │         ▼                ▼         │  │
//! │  │    ┌──────────────────────────┐    │  │
//! │  │    │        kenn-core         │    │  │
//! │  │    └──────────────────────────┘    │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config` — `WorldConfig` (core sections plus `[grid]` and `[tick]`)
//! - `grid` — uniform-grid `SpatialIndex`
//! - `logging` — tracing subscriber setup
//! - `systems` — visibility, target acquisition and the parallel tick

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod grid;
pub mod logging;
pub mod systems;

use std::sync::Arc;

use kenn_core::clock::{Clock, MonotonicClock};
use kenn_core::World;

pub use config::WorldConfig;
pub use grid::GridIndex;
pub use systems::{TickReport, Ticker};

/// Build a world backed by a [`GridIndex`] and a monotonic clock.
#[must_use]
pub fn build_world(config: &WorldConfig) -> World {
    build_world_with_clock(config, Arc::new(MonotonicClock::new()))
}

/// Build a world backed by a [`GridIndex`] and the given clock.
#[must_use]
pub fn build_world_with_clock(config: &WorldConfig, clock: Arc<dyn Clock>) -> World {
    World::new(
        config.core.interest.clone(),
        clock,
        Arc::new(GridIndex::new(config.grid.cell_size)),
    )
}
