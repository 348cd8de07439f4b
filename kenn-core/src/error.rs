//! Error types for the KENN core library.
//!
//! Interest-set mutations never fail with an error: a rejected edge is a
//! [`Violation`], logged and reported as `false`. [`KennError`] covers the
//! surfaces around them (configuration, registry bookkeeping).

use thiserror::Error;

use crate::types::AgentId;

/// Top-level error type for all KENN operations that can fail.
#[derive(Error, Debug)]
pub enum KennError {
    /// An agent with this id is already registered.
    #[error("Agent already registered: {0}")]
    DuplicateAgent(AgentId),

    /// No live agent with this id.
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, KennError>;

/// A tracking policy an edge insert would have broken.
///
/// Carried in diagnostic log lines; the operation itself becomes a no-op.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// The two agents live in different world instances.
    #[error("variation mismatch")]
    VariationMismatch,

    /// Only players may be recorded as observers.
    #[error("observer is not a player")]
    NonPlayerObserver,

    /// Static scenery cannot hold observer or target edges.
    #[error("static object cannot track peers")]
    StaticObject,

    /// One side has already been torn down.
    #[error("agent already torn down")]
    TornDown,

    /// An agent cannot relate to itself.
    #[error("self reference")]
    SelfReference,

    /// First contact farther than the initial clamp radius.
    #[error("outside initial clamp radius")]
    OutsideClamp,

    /// Combat pets only track monsters.
    #[error("combat pet candidate is not a monster")]
    PetNonMonster,

    /// Faction mobs only track players, pets and opposing monsters.
    #[error("faction mob candidate is not a player, pet or opposing monster")]
    FactionNonOpponent,

    /// Regular creatures only track players, pets and their foe type.
    #[error("candidate is not a player, pet or foe")]
    NotAFoe,
}
