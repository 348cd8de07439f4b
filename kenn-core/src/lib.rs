//! # KENN Core Library
//!
//! Game-agnostic interest management for virtual-world servers.
//!
//! Every tracked entity is an [`Agent`] carrying an [`InterestSet`]: six
//! concurrent collections describing who it knows, sees and fights.
//!
//! - **Known** — agents the owner's client has been told about
//! - **Visible** — agents currently in perceptual range (always Known)
//! - **PendingDestruction** — agents that left range and are forgotten
//!   after a grace period unless they come back
//! - **KnownObservers** — players that know the owner
//! - **Targets** — combat candidates chosen by the [`classifier`]
//! - **RetaliateTargets** — provoked targets outside the normal policy
//!
//! ## Concurrency Contract
//!
//! All mutations take `&self` and may run from any number of threads at
//! once. Inserts and removals are idempotent and converge regardless of
//! interleaving. No operation blocks on another agent or performs I/O.
//!
//! ```rust
//! use std::sync::Arc;
//! use kenn_core::{AgentBuilder, AgentId, Capabilities, InterestConfig, Relation, World};
//!
//! let world = World::detached(InterestConfig::default());
//! let player = world.spawn(AgentBuilder::new(AgentId(1)).caps(Capabilities::player()))?;
//! let drudge = world.spawn(AgentBuilder::new(AgentId(2)).caps(Capabilities::monster(None)))?;
//!
//! assert!(player.add_visible(&drudge));
//! assert!(drudge.contains(Relation::KnownObservers, player.id()));
//! assert!(drudge.contains(Relation::Targets, player.id()));
//! # Ok::<(), kenn_core::KennError>(())
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod classifier;
pub mod clock;
pub mod config;
mod destruction;
pub mod error;
pub mod interest;
pub mod metrics;
pub mod query;
pub mod spatial;
mod teardown;
pub mod types;
pub mod world;

pub use agent::{Agent, AgentBuilder, InterestContext};
pub use classifier::{CandidateFilter, TargetVerdict};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{InterestConfig, KennConfig};
pub use error::{KennError, Violation};
pub use interest::{InterestSet, Relation};
pub use query::InterestSummary;
pub use spatial::SpatialIndex;
pub use types::*;
pub use world::World;
