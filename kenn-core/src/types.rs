//! Core type definitions for the KENN interest-management system.
//!
//! Identity, world-instance tags, positions, timestamps and the capability
//! flags the classifier evaluates.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Stable unique identifier for an agent (player, monster, pet, scenery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// World-instance tag. Agents in different variations never interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variation(pub i32);

impl fmt::Display for Variation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Creature classification used by foe-type rules (e.g. undead, olthoi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreatureType(pub u16);

/// Faction membership bitmask. Two faction mobs share a faction when their
/// masks intersect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactionBits(pub u32);

impl FactionBits {
    /// Whether the two masks share at least one faction.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 3D position in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Location {
    /// Create a location from its three coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance on the ground plane (height ignored).
    #[must_use]
    pub fn distance_2d_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Monotonic time in seconds, as produced by a [`crate::clock::Clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub OrderedFloat<f64>);

impl Timestamp {
    /// The zero timestamp.
    pub const ZERO: Self = Self(OrderedFloat(0.0));

    /// Wrap raw seconds.
    #[must_use]
    pub fn from_secs(secs: f64) -> Self {
        Self(OrderedFloat(secs))
    }

    /// Raw seconds.
    #[must_use]
    pub fn secs(self) -> f64 {
        self.0.into_inner()
    }

    /// This timestamp shifted forward by `secs`.
    #[must_use]
    pub fn plus(self, secs: f64) -> Self {
        Self::from_secs(self.secs() + secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.secs())
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Capability flags of an agent, evaluated by [`crate::classifier`].
///
/// Owned by gameplay systems; the interest core only reads them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Player-controlled avatar.
    pub is_player: bool,
    /// Hostile creature.
    pub is_monster: bool,
    /// Summoned pet that fights monsters on behalf of a player.
    pub is_combat_pet: bool,
    /// Faction membership; `Some` makes this a faction mob.
    pub faction: Option<FactionBits>,
    /// What kind of creature this is.
    pub creature_type: Option<CreatureType>,
    /// Creature type this agent hunts regardless of the usual rules.
    pub foe_type: Option<CreatureType>,
    /// Only attackable by (or only attacks as) a player killer.
    pub player_killer: bool,
    /// Static scenery; never holds observer or target edges.
    pub is_static: bool,
}

impl Capabilities {
    /// A plain player avatar.
    #[must_use]
    pub fn player() -> Self {
        Self {
            is_player: true,
            ..Self::default()
        }
    }

    /// A monster with an optional creature type.
    #[must_use]
    pub fn monster(creature_type: Option<CreatureType>) -> Self {
        Self {
            is_monster: true,
            creature_type,
            ..Self::default()
        }
    }

    /// A monster belonging to the given faction.
    #[must_use]
    pub fn faction_mob(faction: FactionBits) -> Self {
        Self {
            is_monster: true,
            faction: Some(faction),
            ..Self::default()
        }
    }

    /// A player's combat pet.
    #[must_use]
    pub fn combat_pet() -> Self {
        Self {
            is_combat_pet: true,
            ..Self::default()
        }
    }

    /// Builder: set the foe type.
    #[must_use]
    pub fn with_foe_type(mut self, foe: CreatureType) -> Self {
        self.foe_type = Some(foe);
        self
    }

    /// Builder: set the creature type.
    #[must_use]
    pub fn with_creature_type(mut self, creature: CreatureType) -> Self {
        self.creature_type = Some(creature);
        self
    }

    /// Whether this agent is a faction mob.
    #[must_use]
    pub fn is_faction_mob(&self) -> bool {
        self.faction.is_some()
    }

    /// Whether both agents are faction mobs sharing a faction.
    #[must_use]
    pub fn same_faction(&self, other: &Self) -> bool {
        match (self.faction, other.faction) {
            (Some(a), Some(b)) => a.intersects(b),
            _ => false,
        }
    }

    /// Whether this agent declares `other` as its foe while `other` does not
    /// declare this agent back.
    #[must_use]
    pub fn one_sided_foe_of(&self, other: &Self) -> bool {
        let hunts_other = self.foe_type.is_some() && self.foe_type == other.creature_type;
        let reciprocated = other.foe_type.is_some() && other.foe_type == self.creature_type;
        hunts_other && !reciprocated
    }

    /// Whether this agent's foe type matches `other`'s creature type.
    #[must_use]
    pub fn hunts(&self, other: &Self) -> bool {
        self.foe_type.is_some() && self.foe_type == other.creature_type
    }
}
