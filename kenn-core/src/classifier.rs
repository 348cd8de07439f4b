//! Capability classifier — who may see and who may target whom.
//!
//! Two pure functions over [`Capabilities`]:
//!
//! - [`classify`] filters raw spatial candidates for an observer under a
//!   [`CandidateFilter`] policy.
//! - [`target_verdict`] decides whether a target edge is accepted, rejected,
//!   or must be recorded the other way round.
//!
//! ## Target policies, by observer class
//!
//! | Observer             | Accepts                                              |
//! |----------------------|------------------------------------------------------|
//! | Combat pet           | monsters                                             |
//! | Faction mob          | players, combat pets, monsters of another faction    |
//! | Regular with foe     | players, combat pets, creatures of its foe type      |
//! | Regular              | players, combat pets                                 |
//!
//! A regular observer facing a faction mob, or a creature that hunts the
//! observer's type without being hunted back, gets [`TargetVerdict::Invert`]:
//! only the candidate records the edge. Ordinary creatures thereby never
//! pick such candidates on their own, but remain valid targets for them.

use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::types::Capabilities;

/// Policy applied to raw spatial candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CandidateFilter {
    /// Everything the spatial index returned.
    #[default]
    All,
    /// Player avatars only.
    Players,
    /// Candidates the observer could fight, including inverse-only ones.
    AttackTargets,
}

/// Outcome of evaluating a prospective target edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetVerdict {
    /// Record `observer → candidate`.
    Accept,
    /// Record nothing.
    Reject(Violation),
    /// Record only `candidate → observer`.
    Invert,
}

/// Include/exclude a raw candidate for `observer` under `policy`.
///
/// `AttackTargets` is deliberately wider than [`target_verdict`]'s accept
/// set: faction mobs and creatures hunting the observer pass so the
/// inversion can register their edge.
#[must_use]
pub fn classify(observer: &Capabilities, candidate: &Capabilities, policy: CandidateFilter) -> bool {
    match policy {
        CandidateFilter::All => true,
        CandidateFilter::Players => candidate.is_player,
        CandidateFilter::AttackTargets => {
            if observer.is_combat_pet {
                // pets cannot engage player-killer-only creatures (faction banners)
                candidate.is_monster && !candidate.player_killer
            } else if observer.is_faction_mob() {
                candidate.is_player
                    || candidate.is_combat_pet
                    || (candidate.is_monster && !observer.same_faction(candidate))
            } else {
                candidate.is_player
                    || (candidate.is_combat_pet && !observer.player_killer)
                    || candidate.is_faction_mob()
                    || candidate.hunts(observer)
                    || observer.hunts(candidate)
            }
        }
    }
}

/// Decide how a target edge between `observer` and `candidate` is recorded.
#[must_use]
pub fn target_verdict(observer: &Capabilities, candidate: &Capabilities) -> TargetVerdict {
    if observer.is_static {
        return TargetVerdict::Reject(Violation::StaticObject);
    }

    if observer.is_combat_pet {
        return if candidate.is_monster {
            TargetVerdict::Accept
        } else {
            TargetVerdict::Reject(Violation::PetNonMonster)
        };
    }

    if observer.is_faction_mob() {
        let opponent = candidate.is_player
            || candidate.is_combat_pet
            || (candidate.is_monster && !observer.same_faction(candidate));
        return if opponent {
            TargetVerdict::Accept
        } else {
            TargetVerdict::Reject(Violation::FactionNonOpponent)
        };
    }

    if candidate.is_faction_mob() || candidate.one_sided_foe_of(observer) {
        return TargetVerdict::Invert;
    }

    if candidate.is_player || candidate.is_combat_pet || observer.hunts(candidate) {
        TargetVerdict::Accept
    } else {
        TargetVerdict::Reject(Violation::NotAFoe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CreatureType, FactionBits};

    const UNDEAD: CreatureType = CreatureType(14);
    const TUSKER: CreatureType = CreatureType(3);

    #[test]
    fn pets_only_target_monsters() {
        let pet = Capabilities::combat_pet();
        assert_eq!(
            target_verdict(&pet, &Capabilities::monster(None)),
            TargetVerdict::Accept
        );
        assert_eq!(
            target_verdict(&pet, &Capabilities::player()),
            TargetVerdict::Reject(Violation::PetNonMonster)
        );
        assert_eq!(
            target_verdict(&pet, &Capabilities::combat_pet()),
            TargetVerdict::Reject(Violation::PetNonMonster)
        );
    }

    #[test]
    fn faction_mobs_skip_their_own_faction() {
        let f1 = Capabilities::faction_mob(FactionBits(1));
        let f2 = Capabilities::faction_mob(FactionBits(2));
        let also_f1 = Capabilities::faction_mob(FactionBits(1));

        assert_eq!(target_verdict(&f1, &f2), TargetVerdict::Accept);
        assert_eq!(
            target_verdict(&f1, &also_f1),
            TargetVerdict::Reject(Violation::FactionNonOpponent)
        );
        assert_eq!(target_verdict(&f1, &Capabilities::player()), TargetVerdict::Accept);
        assert_eq!(target_verdict(&f1, &Capabilities::combat_pet()), TargetVerdict::Accept);
        assert_eq!(
            target_verdict(&f1, &Capabilities::monster(None)),
            TargetVerdict::Accept
        );
    }

    #[test]
    fn regular_monsters_target_players_and_pets() {
        let drudge = Capabilities::monster(Some(TUSKER));
        assert_eq!(target_verdict(&drudge, &Capabilities::player()), TargetVerdict::Accept);
        assert_eq!(
            target_verdict(&drudge, &Capabilities::combat_pet()),
            TargetVerdict::Accept
        );
        assert_eq!(
            target_verdict(&drudge, &Capabilities::monster(Some(UNDEAD))),
            TargetVerdict::Reject(Violation::NotAFoe)
        );
    }

    #[test]
    fn regular_monsters_invert_on_faction_mobs() {
        let drudge = Capabilities::monster(None);
        let banner_guard = Capabilities::faction_mob(FactionBits(4));
        assert_eq!(target_verdict(&drudge, &banner_guard), TargetVerdict::Invert);
    }

    #[test]
    fn foe_type_hunter_accepts_its_prey_and_prey_inverts() {
        let hunter = Capabilities::monster(Some(TUSKER)).with_foe_type(UNDEAD);
        let zombie = Capabilities::monster(Some(UNDEAD));

        assert_eq!(target_verdict(&hunter, &zombie), TargetVerdict::Accept);
        assert_eq!(target_verdict(&zombie, &hunter), TargetVerdict::Invert);
    }

    #[test]
    fn mutual_foes_accept_each_other() {
        let a = Capabilities::monster(Some(TUSKER)).with_foe_type(UNDEAD);
        let b = Capabilities::monster(Some(UNDEAD)).with_foe_type(TUSKER);
        assert_eq!(target_verdict(&a, &b), TargetVerdict::Accept);
        assert_eq!(target_verdict(&b, &a), TargetVerdict::Accept);
    }

    #[test]
    fn static_objects_never_target() {
        let scenery = Capabilities {
            is_static: true,
            ..Capabilities::default()
        };
        assert_eq!(
            target_verdict(&scenery, &Capabilities::player()),
            TargetVerdict::Reject(Violation::StaticObject)
        );
    }

    #[test]
    fn attack_filter_keeps_inverse_only_candidates() {
        let drudge = Capabilities::monster(None);
        let banner_guard = Capabilities::faction_mob(FactionBits(4));
        let hunter = Capabilities::monster(Some(TUSKER)).with_foe_type(UNDEAD);
        let zombie = Capabilities::monster(Some(UNDEAD));

        assert!(classify(&drudge, &banner_guard, CandidateFilter::AttackTargets));
        assert!(classify(&zombie, &hunter, CandidateFilter::AttackTargets));
        assert!(!classify(&drudge, &zombie, CandidateFilter::AttackTargets));
    }

    #[test]
    fn attack_filter_player_killer_rules() {
        let pet = Capabilities::combat_pet();
        let banner = Capabilities {
            player_killer: true,
            ..Capabilities::monster(None)
        };
        assert!(!classify(&pet, &banner, CandidateFilter::AttackTargets));

        let pk_monster = Capabilities {
            player_killer: true,
            ..Capabilities::monster(None)
        };
        assert!(!classify(&pk_monster, &pet, CandidateFilter::AttackTargets));
        assert!(classify(&pk_monster, &Capabilities::player(), CandidateFilter::AttackTargets));
    }

    #[test]
    fn players_filter_and_all_filter() {
        let observer = Capabilities::player();
        assert!(classify(&observer, &Capabilities::player(), CandidateFilter::Players));
        assert!(!classify(&observer, &Capabilities::monster(None), CandidateFilter::Players));
        assert!(classify(&observer, &Capabilities::monster(None), CandidateFilter::All));
    }
}
