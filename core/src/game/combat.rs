use rand::Rng;
use rand::rngs::StdRng;

use super::empire::EmpireState;
use super::galaxy::Galaxy;
use super::{EmpireId, SystemId};

const MISSILE_BASE_STRENGTH: f64 = 5.0;

/// Hostile non-empire force entering a system.
#[derive(Debug, Clone, PartialEq)]
pub struct RaiderProfile {
    pub name: String,
    pub attack: f64,
    pub hull: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattleOutcome {
    pub raider_destroyed: bool,
    pub last_attacker: Option<EmpireId>,
    pub hull_damage: f64,
}

impl BattleOutcome {
    pub fn no_battle() -> Self {
        Self {
            raider_destroyed: false,
            last_attacker: None,
            hull_damage: 0.0,
        }
    }
}

/// Resolves a battle between a raider and the defenders of a system.
pub trait CombatResolver {
    fn battle(
        &mut self,
        galaxy: &mut Galaxy,
        empires: &[EmpireState],
        system: SystemId,
        raider: &RaiderProfile,
        rng: &mut StdRng,
    ) -> BattleOutcome;
}

/// Compares raw defensive strength against the raider with a random spread.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrengthCombat;

impl CombatResolver for StrengthCombat {
    fn battle(
        &mut self,
        galaxy: &mut Galaxy,
        empires: &[EmpireState],
        system: SystemId,
        raider: &RaiderProfile,
        rng: &mut StdRng,
    ) -> BattleOutcome {
        let Some(star) = galaxy.system_mut(system) else {
            return BattleOutcome::no_battle();
        };
        let bonus_of = |owner: EmpireId| {
            empires
                .get(owner.0)
                .map_or(0.0, |empire| empire.modifiers.weapon_damage)
        };

        let mut strongest: Option<(EmpireId, f64)> = None;
        let mut defence = 0.0;
        if let Some(colony) = star.colony.as_ref() {
            let ground = empires
                .get(colony.owner.0)
                .map_or(0.0, |empire| empire.modifiers.ground_defense);
            let bases = f64::from(colony.missile_bases) * (MISSILE_BASE_STRENGTH + ground);
            if bases > 0.0 {
                defence += bases;
                strongest = Some((colony.owner, bases));
            }
        }
        for fleet in &star.fleets {
            let strength = fleet.strength * (1.0 + bonus_of(fleet.owner));
            defence += strength;
            if strongest.is_none_or(|(_, best)| strength > best) {
                strongest = Some((fleet.owner, strength));
            }
        }
        if defence <= 0.0 {
            return BattleOutcome::no_battle();
        }

        let hull_damage = defence * rng.gen_range(0.5..1.5);
        let inflicted = raider.attack * rng.gen_range(0.5..1.5);
        for fleet in star.fleets.iter_mut() {
            fleet.strength = (fleet.strength - inflicted / 2.0).max(0.0);
        }
        star.fleets.retain(|fleet| fleet.strength > 0.0);
        if let Some(colony) = star.colony.as_mut() {
            let lost = (inflicted / (2.0 * MISSILE_BASE_STRENGTH)).floor() as u32;
            colony.missile_bases = colony.missile_bases.saturating_sub(lost);
        }

        BattleOutcome {
            raider_destroyed: hull_damage >= raider.hull,
            last_attacker: strongest.map(|(owner, _)| owner),
            hull_damage,
        }
    }
}
