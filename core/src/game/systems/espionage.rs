use tracing::debug;

use crate::game::embassy::{SabotageKind, SpyMission, SpyNetwork};
use crate::game::empire::{EmpireState, Personality};
use crate::game::galaxy::Galaxy;
use crate::game::tech::TechCatalog;
use crate::game::{
    EmpireId, GameOptions, MAX_SECURITY_LEVEL, MAX_SPY_ALLOCATION, SystemId, TreatyStatus,
};

/// Internal security an empire should fund given its contacts.
pub fn suggested_internal_security_level(
    empires: &[EmpireState],
    empire: EmpireId,
    options: &GameOptions,
) -> i32 {
    let Some(owner) = empires.get(empire.0) else {
        return 0;
    };
    let modifier = options.ai_production_modifier;
    let mut paranoia = 0.0;
    let mut any_contact = false;
    for view in owner.views.values() {
        if !view.embassy.contact {
            continue;
        }
        let active = empires
            .get(view.target.0)
            .is_some_and(|other| other.is_active());
        if !active {
            continue;
        }
        any_contact = true;
        if view.embassy.is_at_war() {
            paranoia += 3.0 * modifier;
        } else if view.embassy.has_no_treaty() {
            paranoia += modifier;
        }
    }

    let mut level = paranoia.floor() as i32;
    if any_contact {
        level = level.max(1);
    }
    if owner.leader.is_xenophobic() {
        level *= 2;
    }
    level.clamp(0, MAX_SECURITY_LEVEL)
}

/// Spies wanted against one counterpart before scaling for galaxy size.
pub fn max_spies_needed(
    empires: &[EmpireState],
    spy: EmpireId,
    target: EmpireId,
    options: &GameOptions,
) -> f64 {
    let Some(view) = empires.get(spy.0).and_then(|owner| owner.view(target)) else {
        return 0.0;
    };
    let base = match view.embassy.status {
        TreatyStatus::War => 3.0,
        TreatyStatus::NoTreaty => 2.0,
        TreatyStatus::Pact => 1.0,
        TreatyStatus::Alliance | TreatyStatus::Unity => 0.0,
    };
    let mut need = base * options.ai_production_modifier.max(0.0).sqrt();
    let active = empires.iter().filter(|empire| empire.is_active()).count();
    if active > 4 {
        need *= 4.0 / active as f64;
    }
    need
}

/// Spy allocation ticks toward `target`, 0..=10.
pub fn suggested_spy_allocation(
    empires: &[EmpireState],
    galaxy: &Galaxy,
    spy: EmpireId,
    target: EmpireId,
    options: &GameOptions,
) -> i32 {
    let (Some(owner), Some(other)) = (empires.get(spy.0), empires.get(target.0)) else {
        return 0;
    };
    let Some(view) = owner.view(target) else {
        return 0;
    };
    if !view.embassy.contact || !other.is_active() || !owner.in_economic_range(target, galaxy) {
        return 0;
    }
    let need = max_spies_needed(empires, spy, target, options);
    let active = f64::from(view.spies.active_spies);
    if active >= need {
        return 0;
    }
    (((need - active) * 2.0).ceil() as i32).min(MAX_SPY_ALLOCATION)
}

/// Mission the empire's leader would pick against `target`.
pub fn suggested_mission(empires: &[EmpireState], spy: EmpireId, target: EmpireId) -> SpyMission {
    let (Some(owner), Some(other)) = (empires.get(spy.0), empires.get(target.0)) else {
        return SpyMission::Hide;
    };
    let Some(view) = owner.view(target) else {
        return SpyMission::Hide;
    };
    if !other.is_active() || !view.embassy.contact || view.embassy.is_allied() {
        return SpyMission::Hide;
    }

    let network = &view.spies;
    let relations = view.embassy.relations;
    if view.embassy.is_at_war() {
        return if network.can_steal_war_tech() {
            SpyMission::Espionage
        } else if network.can_sabotage() {
            SpyMission::Sabotage
        } else if network.can_steal() {
            SpyMission::Espionage
        } else {
            SpyMission::Hide
        };
    }

    let no_treaty = view.embassy.has_no_treaty();
    let mission = match owner.leader.personality {
        Personality::Aggressive | Personality::Ruthless => {
            if no_treaty && relations < 0 && network.can_sabotage() {
                SpyMission::Sabotage
            } else if network.can_steal() {
                SpyMission::Espionage
            } else {
                SpyMission::Hide
            }
        }
        Personality::Erratic => {
            if relations < -25 && network.can_sabotage() {
                SpyMission::Sabotage
            } else if relations < 25 && network.can_steal() {
                SpyMission::Espionage
            } else {
                SpyMission::Hide
            }
        }
        Personality::Xenophobic => {
            if relations < 50 && network.can_steal() {
                SpyMission::Espionage
            } else {
                SpyMission::Hide
            }
        }
        Personality::Pacifist | Personality::Honorable => {
            if no_treaty && relations < -50 && network.can_steal() {
                SpyMission::Espionage
            } else {
                SpyMission::Hide
            }
        }
    };

    if mission == SpyMission::Hide
        && owner.leader.is_technologist()
        && relations < 75
        && network.can_steal()
    {
        return SpyMission::Espionage;
    }
    mission
}

/// At war military targets come first, at peace unrest does.
pub fn best_sabotage_choice(network: &SpyNetwork, at_war: bool) -> Option<SabotageKind> {
    let order = if at_war {
        [
            SabotageKind::MissileBases,
            SabotageKind::Factories,
            SabotageKind::Rebellion,
        ]
    } else {
        [
            SabotageKind::Rebellion,
            SabotageKind::Factories,
            SabotageKind::MissileBases,
        ]
    };
    order
        .into_iter()
        .find(|kind| best_system_for_sabotage(network, *kind).is_some())
}

pub fn best_system_for_sabotage(network: &SpyNetwork, kind: SabotageKind) -> Option<SystemId> {
    let targets = match kind {
        SabotageKind::MissileBases => &network.base_targets,
        SabotageKind::Factories => &network.factory_targets,
        SabotageKind::Rebellion => &network.rebellion_targets,
    };
    targets.first().copied()
}

/// Picks which of two empires to blame for an operation.
pub fn suggest_to_frame(
    empires: &[EmpireState],
    galaxy: &Galaxy,
    spy: EmpireId,
    a: EmpireId,
    b: EmpireId,
) -> EmpireId {
    let Some(owner) = empires.get(spy.0) else {
        return a;
    };
    let war_a = owner.is_at_war_with(a);
    let war_b = owner.is_at_war_with(b);
    if war_a != war_b {
        return if war_a { a } else { b };
    }
    if !war_a {
        let ally_a = owner.is_allied_with(a);
        let ally_b = owner.is_allied_with(b);
        if ally_a != ally_b {
            return if ally_a { b } else { a };
        }
    }
    let power = |id: EmpireId| {
        empires
            .get(id.0)
            .map_or(0.0, |empire| empire.industrial_power_level(galaxy))
    };
    if power(b) > power(a) { b } else { a }
}

/// Rebuilds every spy network's target lists from the current galaxy.
pub(crate) fn refresh_targets(empires: &mut [EmpireState], galaxy: &Galaxy, catalog: &TechCatalog) {
    let mut updates = Vec::new();
    for owner in empires.iter() {
        for view in owner.views.values() {
            let Some(target) = empires.get(view.target.0) else {
                continue;
            };
            updates.push((owner.id, target.id, scout(owner, target, galaxy, catalog)));
        }
    }
    for (owner, target, scouted) in updates {
        if let Some(network) = empires
            .get_mut(owner.0)
            .and_then(|empire| empire.view_mut(target))
            .map(|view| &mut view.spies)
        {
            network.base_targets = scouted.base_targets;
            network.factory_targets = scouted.factory_targets;
            network.rebellion_targets = scouted.rebellion_targets;
            network.stealable_techs = scouted.stealable_techs;
            network.war_techs = scouted.war_techs;
        }
    }
}

fn scout(
    owner: &EmpireState,
    target: &EmpireState,
    galaxy: &Galaxy,
    catalog: &TechCatalog,
) -> SpyNetwork {
    let by_distance = |ids: &mut Vec<SystemId>| {
        ids.sort_by(|a, b| {
            galaxy
                .min_colony_distance(owner.id, *a)
                .total_cmp(&galaxy.min_colony_distance(owner.id, *b))
                .then_with(|| a.cmp(b))
        });
    };
    let colonies = galaxy
        .colonies_of(target.id)
        .filter_map(|system| system.colony.as_ref().map(|colony| (system.id, colony)))
        .collect::<Vec<_>>();

    let mut base_targets = colonies
        .iter()
        .filter(|(_, colony)| colony.missile_bases > 0)
        .map(|(id, _)| *id)
        .collect::<Vec<_>>();
    by_distance(&mut base_targets);
    let mut factory_targets = colonies
        .iter()
        .filter(|(_, colony)| colony.factories > 0.0)
        .map(|(id, _)| *id)
        .collect::<Vec<_>>();
    by_distance(&mut factory_targets);
    let mut rebels = colonies
        .iter()
        .filter(|(_, colony)| !colony.rebellion && colony.population > 0.0)
        .map(|(id, colony)| (*id, colony.population))
        .collect::<Vec<_>>();
    rebels.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut stealable_techs = Vec::new();
    let mut war_techs = Vec::new();
    for category in target.tech.categories() {
        for id in category.known_techs() {
            if owner.tech.knows(id) {
                continue;
            }
            stealable_techs.push(id.clone());
            if catalog.get(id).is_some_and(|tech| tech.has_combat_value()) {
                war_techs.push(id.clone());
            }
        }
    }

    SpyNetwork {
        base_targets,
        factory_targets,
        rebellion_targets: rebels.into_iter().map(|(id, _)| id).collect(),
        stealable_techs,
        war_techs,
        ..SpyNetwork::default()
    }
}

/// AI decisions for the turn: allocation and mission per counterpart.
pub(crate) fn plan(empires: &mut [EmpireState], galaxy: &Galaxy, options: &GameOptions) {
    let mut decisions = Vec::new();
    for owner in empires.iter().filter(|empire| !empire.is_player && empire.is_active()) {
        for target in owner.views.keys() {
            let allocation = suggested_spy_allocation(empires, galaxy, owner.id, *target, options);
            let mission = suggested_mission(empires, owner.id, *target);
            decisions.push((owner.id, *target, allocation, mission));
        }
    }
    for (owner, target, allocation, mission) in decisions {
        debug!(
            spy = owner.0,
            target = target.0,
            allocation,
            ?mission,
            "諜報方針を決定しました"
        );
        if let Some(view) = empires
            .get_mut(owner.0)
            .and_then(|empire| empire.view_mut(target))
        {
            view.spies.set_allocation(allocation);
            view.spies.mission = mission;
        }
    }
}

/// Applies the suggested security level to every AI empire.
pub(crate) fn review_security(empires: &mut [EmpireState], options: &GameOptions) -> Vec<String> {
    let levels = empires
        .iter()
        .map(|empire| {
            let suggested = if empire.is_player || !empire.is_active() {
                None
            } else {
                Some(suggested_internal_security_level(empires, empire.id, options))
            };
            (empire.id, suggested)
        })
        .collect::<Vec<_>>();
    let mut reports = Vec::new();
    for (id, level) in levels {
        let Some(level) = level else {
            continue;
        };
        let Some(empire) = empires.get_mut(id.0) else {
            continue;
        };
        if empire.internal_security() != level {
            empire.set_internal_security(level);
            reports.push(format!(
                "{} は国内保安レベルを {} に変更しました。",
                empire.name, level
            ));
        }
    }
    reports
}
