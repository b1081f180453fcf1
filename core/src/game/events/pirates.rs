use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EventContext, EventProgress};
use crate::game::combat::RaiderProfile;
use crate::game::galaxy::{NearbySystem, StarSystem, SystemEvent};
use crate::game::{
    EmpireId, PIRATE_APPROACH_TURNS, PIRATE_NEARBY_SYSTEMS, PIRATE_PILLAGE_SHARE,
    PIRATE_PLUNDER_PER_TURN, PIRATE_SEARCH_PASSES, PIRATE_SPEED, SystemId,
};

const PIRATE_HULL: f64 = 400.0;
const PIRATE_ATTACK: f64 = 60.0;

/// The raider itself. Survives between triggers and is repaired on each one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PirateFleet {
    pub hull: f64,
    pub max_hull: f64,
    pub attack: f64,
    pub last_attacker: Option<EmpireId>,
    pub visited: BTreeSet<SystemId>,
}

impl Default for PirateFleet {
    fn default() -> Self {
        Self {
            hull: PIRATE_HULL,
            max_hull: PIRATE_HULL,
            attack: PIRATE_ATTACK,
            last_attacker: None,
            visited: BTreeSet::new(),
        }
    }
}

impl PirateFleet {
    fn profile(&self) -> RaiderProfile {
        RaiderProfile {
            name: "宇宙海賊".to_string(),
            attack: self.attack,
            hull: self.hull,
        }
    }

    fn refit(&mut self) {
        self.hull = self.max_hull;
        self.last_attacker = None;
        self.visited.clear();
    }
}

/// Roaming pirate fleet. Approaches a colony, raids it and moves on until it
/// is destroyed or runs out of targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PiratesEvent {
    fleet: PirateFleet,
    target_empire: Option<EmpireId>,
    system: Option<SystemId>,
    countdown: u32,
}

impl PiratesEvent {
    pub fn fleet(&self) -> &PirateFleet {
        &self.fleet
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn target_system(&self) -> Option<SystemId> {
        self.system
    }

    pub fn target_empire(&self) -> Option<EmpireId> {
        self.target_empire
    }

    pub fn trigger(&mut self, target: EmpireId, ctx: &mut EventContext<'_>) -> EventProgress {
        let colonies = ctx
            .galaxy
            .colonies_of(target)
            .map(|system| system.id)
            .collect::<Vec<_>>();
        let Some(&system) = colonies.choose(&mut *ctx.rng) else {
            debug!(empire = target.0, "宇宙海賊の標的となる植民地がありません");
            return EventProgress::Finished;
        };
        self.fleet.refit();
        self.target_empire = Some(target);
        self.system = Some(system);
        self.countdown = PIRATE_APPROACH_TURNS;
        EventProgress::Ongoing
    }

    pub fn next_turn(&mut self, ctx: &mut EventContext<'_>) -> EventProgress {
        let Some(system) = self.system else {
            return EventProgress::Finished;
        };
        if self.countdown == PIRATE_APPROACH_TURNS {
            self.approach(system, ctx);
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return EventProgress::Ongoing;
        }
        self.enter(system, ctx)
    }

    fn approach(&mut self, system: SystemId, ctx: &mut EventContext<'_>) {
        if let Some(star) = ctx.galaxy.system_mut(system) {
            star.event = Some(SystemEvent::PiratesApproaching);
        }
        let message = format!(
            "宇宙海賊の艦隊が {} に接近しています。{} ターン後に到着します。",
            ctx.system_name(system),
            PIRATE_APPROACH_TURNS
        );
        ctx.notify_random_event(message, "pirates");
    }

    fn enter(&mut self, system: SystemId, ctx: &mut EventContext<'_>) -> EventProgress {
        let (colonized, defended) = match ctx.galaxy.system_mut(system) {
            Some(star) => {
                if star.event == Some(SystemEvent::PiratesApproaching) {
                    star.event = None;
                }
                (star.is_colonized(), star.is_defended())
            }
            None => (false, false),
        };
        self.fleet.visited.insert(system);

        if colonized && defended {
            let profile = self.fleet.profile();
            let outcome =
                ctx.combat
                    .battle(ctx.galaxy, ctx.empires, system, &profile, &mut *ctx.rng);
            self.fleet.hull = (self.fleet.hull - outcome.hull_damage).max(0.0);
            if outcome.last_attacker.is_some() {
                self.fleet.last_attacker = outcome.last_attacker;
            }
            if outcome.raider_destroyed || self.fleet.hull <= 0.0 {
                return self.destroyed(system, ctx);
            }
        }

        if colonized {
            self.pillage(system, ctx);
        }
        self.move_to_next_system(system, ctx)
    }

    fn pillage(&mut self, system: SystemId, ctx: &mut EventContext<'_>) {
        let Some(colony) = ctx
            .galaxy
            .system_mut(system)
            .and_then(|star| star.colony.as_mut())
        else {
            return;
        };
        let owner = colony.owner;
        colony.population = pillaged(colony.population);
        colony.factories = pillaged(colony.factories);
        let message = format!(
            "宇宙海賊が {} ({}) を略奪しました。",
            ctx.system_name(system),
            ctx.empire_name(owner)
        );
        ctx.notify_random_event(message, "pirates");
    }

    fn destroyed(&mut self, system: SystemId, ctx: &mut EventContext<'_>) -> EventProgress {
        let plunder = PIRATE_PLUNDER_PER_TURN * f64::from(ctx.turn);
        let message = match self.fleet.last_attacker {
            Some(victor) => {
                if let Some(empire) = ctx.empires.get_mut(victor.0) {
                    empire.reserve += plunder;
                }
                format!(
                    "{} で宇宙海賊が撃破されました。{} は {:.0} BC の戦利品を得ました。",
                    ctx.system_name(system),
                    ctx.empire_name(victor),
                    plunder
                )
            }
            None => format!("{} で宇宙海賊が撃破されました。", ctx.system_name(system)),
        };
        ctx.notify_random_event(message, "pirates");
        self.system = None;
        self.target_empire = None;
        self.countdown = 0;
        EventProgress::Finished
    }

    /// Sweeps the nearest systems with a per-pass chance that grows each
    /// pass, favouring unvisited industrial colonies.
    fn move_to_next_system(&mut self, from: SystemId, ctx: &mut EventContext<'_>) -> EventProgress {
        let nearby = ctx.galaxy.nearby_systems(from, PIRATE_NEARBY_SYSTEMS);
        for pass in 1..=PIRATE_SEARCH_PASSES {
            for NearbySystem { id, distance } in &nearby {
                let Some(star) = ctx.galaxy.system(*id) else {
                    continue;
                };
                let chance = hop_chance(pass, self.fleet.visited.contains(id), star);
                if ctx.rng.r#gen::<f64>() < chance {
                    self.system = Some(*id);
                    self.target_empire = star.owner();
                    self.countdown = next_countdown(*distance);
                    debug!(
                        from = from.0,
                        to = id.0,
                        countdown = self.countdown,
                        "宇宙海賊が次の目標へ移動します"
                    );
                    return EventProgress::Ongoing;
                }
            }
        }
        warn!(from = from.0, "宇宙海賊の次の目標が見つかりませんでした");
        self.system = None;
        self.target_empire = None;
        EventProgress::Finished
    }
}

pub(crate) fn hop_chance(pass: u32, visited: bool, star: &StarSystem) -> f64 {
    let pass = f64::from(pass);
    let mut chance = 0.05 * pass;
    if star.is_colonized() && !visited {
        chance += 0.15 * pass;
    }
    chance += (star.factories() / 1000.0).min(0.2);
    if visited {
        chance *= 0.25;
    }
    chance
}

pub(crate) fn next_countdown(distance: f64) -> u32 {
    let travel = (distance / PIRATE_SPEED).ceil();
    if travel.is_finite() && travel > f64::from(PIRATE_APPROACH_TURNS) {
        travel as u32
    } else {
        PIRATE_APPROACH_TURNS
    }
}

fn pillaged(value: f64) -> f64 {
    if value <= 0.0 {
        return value;
    }
    value - value * PIRATE_PILLAGE_SHARE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::test_support::Fixture;
    use crate::game::galaxy::{Galaxy, SystemDefinition};

    #[test]
    fn countdown_never_drops_below_approach_time() {
        assert_eq!(next_countdown(1.0), 3);
        assert_eq!(next_countdown(9.0), 3);
        assert_eq!(next_countdown(9.5), 4);
        assert_eq!(next_countdown(30.0), 10);
    }

    #[test]
    fn pillage_takes_a_third_but_never_everything() {
        assert!((pillaged(90.0) - 60.0).abs() < 1e-9);
        assert!(pillaged(0.5) > 0.0);
        assert_eq!(pillaged(0.0), 0.0);
    }

    #[test]
    fn visited_systems_are_less_attractive() {
        let fixture = Fixture::new(1);
        let vega = fixture.galaxy.system(SystemId(1)).unwrap();
        let fresh = hop_chance(2, false, vega);
        let visited = hop_chance(2, true, vega);
        assert!((fresh - 0.6).abs() < 1e-9);
        assert!((visited - 0.075).abs() < 1e-9);
    }

    #[test]
    fn raiders_disband_when_no_system_is_in_reach() {
        let mut fixture = Fixture::new(4);
        fixture.galaxy = Galaxy::from_definitions(
            vec![SystemDefinition {
                name: "Deneb".to_string(),
                x: 0.0,
                y: 9.0,
                colony: None,
                fleets: Vec::new(),
            }],
            |_| Ok(EmpireId(0)),
        )
        .unwrap();
        let mut pirates = PiratesEvent::default();
        pirates.target_empire = Some(EmpireId(0));
        pirates.system = Some(SystemId(0));
        pirates.countdown = 1;

        let progress = {
            let mut ctx = fixture.context(90);
            pirates.next_turn(&mut ctx)
        };

        assert_eq!(progress, EventProgress::Finished);
        assert!(pirates.target_system().is_none());
        assert!(pirates.target_empire().is_none());
        assert!(pirates.fleet().visited.contains(&SystemId(0)));
        assert!(fixture.combat.battles.is_empty());
        assert!(fixture.notices.is_empty());
    }

    #[test]
    fn undefended_colony_is_pillaged_without_combat() {
        let mut fixture = Fixture::new(5);
        let mut pirates = PiratesEvent::default();
        pirates.target_empire = Some(EmpireId(0));
        pirates.system = Some(SystemId(0));
        pirates.countdown = PIRATE_APPROACH_TURNS;

        let mut progress = EventProgress::Ongoing;
        for turn in 70..73 {
            let mut ctx = fixture.context(turn);
            progress = pirates.next_turn(&mut ctx);
        }

        assert!(fixture.combat.battles.is_empty());
        let sol = fixture.galaxy.system(SystemId(0)).unwrap();
        let colony = sol.colony.as_ref().unwrap();
        assert!((colony.population - 60.0).abs() < 1e-9);
        assert!((colony.factories - 80.0).abs() < 1e-9);
        assert!(sol.event.is_none());
        assert!(pirates.fleet().visited.contains(&SystemId(0)));

        assert_eq!(progress, EventProgress::Ongoing);
        let next = pirates.target_system().unwrap();
        let candidates = fixture
            .galaxy
            .nearby_systems(SystemId(0), PIRATE_NEARBY_SYSTEMS);
        let hop = candidates.iter().find(|c| c.id == next).unwrap();
        assert_eq!(pirates.countdown(), next_countdown(hop.distance));
    }

    #[test]
    fn defended_colony_triggers_battle_and_plunder() {
        let mut fixture = Fixture::new(6);
        fixture.combat.destroy_raider = true;
        let mut pirates = PiratesEvent::default();
        pirates.system = Some(SystemId(1));
        pirates.countdown = 1;

        let before = fixture.empires[0].reserve;
        let progress = {
            let mut ctx = fixture.context(80);
            pirates.next_turn(&mut ctx)
        };
        assert_eq!(progress, EventProgress::Finished);
        assert_eq!(fixture.combat.battles, vec![SystemId(1)]);
        assert!((fixture.empires[0].reserve - before - 4_000.0).abs() < 1e-9);
        assert!(pirates.target_system().is_none());
    }
}
