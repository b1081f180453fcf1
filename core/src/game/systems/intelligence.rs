use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use super::espionage::{best_sabotage_choice, best_system_for_sabotage, suggest_to_frame};
use crate::game::embassy::{Incident, IncidentKind, SabotageKind, SpyMission};
use crate::game::empire::{EmpireState, Objective};
use crate::game::galaxy::Galaxy;
use crate::game::tech::TechCatalog;
use crate::game::{BASE_SPY_COST, EmpireId, SPY_COST_PER_SECURITY, SPY_SPENDING_PER_TICK, TechId};

const SPY_SUCCESS_CHANCE: f64 = 0.2;
const BASE_DETECTION: f64 = 0.1;
const DETECTION_PER_SECURITY: f64 = 0.05;
const MAX_DETECTION: f64 = 0.9;
const FRAME_CHANCE: f64 = 0.5;
const INCIDENT_TURNS: u32 = 10;
const MISSILE_BASE_LOSS: f64 = 0.25;
const FACTORY_LOSS: f64 = 0.1;

pub fn spy_cost(target_security: i32) -> f64 {
    BASE_SPY_COST + SPY_COST_PER_SECURITY * f64::from(target_security.max(0))
}

pub fn detection_chance(target_security: i32) -> f64 {
    (BASE_DETECTION + DETECTION_PER_SECURITY * f64::from(target_security.max(0))).min(MAX_DETECTION)
}

/// Funds, recruits and runs every spy network for the turn.
pub(crate) fn resolve_networks(
    empires: &mut [EmpireState],
    galaxy: &mut Galaxy,
    catalog: &TechCatalog,
    turn: u32,
    rng: &mut StdRng,
) -> Vec<String> {
    let pairs = empires
        .iter()
        .filter(|empire| empire.is_active())
        .flat_map(|empire| empire.contacted().map(move |target| (empire.id, target)))
        .collect::<Vec<_>>();

    let mut reports = Vec::new();
    for (spy, target) in pairs {
        if !empires.get(target.0).is_some_and(EmpireState::is_active) {
            continue;
        }
        recruit(empires, galaxy, spy, target);
        reports.extend(run_missions(empires, galaxy, catalog, turn, spy, target, rng));
    }
    reports
}

fn recruit(empires: &mut [EmpireState], galaxy: &Galaxy, spy: EmpireId, target: EmpireId) {
    let cost = spy_cost(empires.get(target.0).map_or(0, EmpireState::internal_security));
    let Some(owner) = empires.get_mut(spy.0) else {
        return;
    };
    let production = owner.total_production(galaxy);
    let Some(view) = owner.view_mut(target) else {
        return;
    };
    let network = &mut view.spies;
    network.spy_bc += f64::from(network.allocation) * SPY_SPENDING_PER_TICK * production;
    while network.spy_bc >= cost {
        network.spy_bc -= cost;
        network.active_spies += 1;
    }
}

fn run_missions(
    empires: &mut [EmpireState],
    galaxy: &mut Galaxy,
    catalog: &TechCatalog,
    turn: u32,
    spy: EmpireId,
    target: EmpireId,
    rng: &mut StdRng,
) -> Vec<String> {
    let mut reports = Vec::new();
    let Some(network) = empires
        .get(spy.0)
        .and_then(|owner| owner.view(target))
        .map(|view| &view.spies)
    else {
        return reports;
    };
    if network.mission == SpyMission::Hide || network.active_spies == 0 {
        return reports;
    }
    let mission = network.mission;
    let spies = network.active_spies;
    let detection = detection_chance(empires.get(target.0).map_or(0, EmpireState::internal_security));

    let mut captured = 0;
    let mut succeeded = false;
    for _ in 0..spies {
        if rng.r#gen::<f64>() < detection {
            captured += 1;
            continue;
        }
        if !succeeded && rng.r#gen::<f64>() < SPY_SUCCESS_CHANCE {
            succeeded = true;
        }
    }
    debug!(spy = spy.0, target = target.0, ?mission, spies, captured, succeeded, "諜報活動を判定しました");

    if captured > 0 {
        if let Some(view) = empires
            .get_mut(spy.0)
            .and_then(|owner| owner.view_mut(target))
        {
            view.spies.active_spies = view.spies.active_spies.saturating_sub(captured);
        }
        let kind = match mission {
            SpyMission::Sabotage => IncidentKind::Sabotage,
            SpyMission::Espionage | SpyMission::Hide => IncidentKind::Espionage,
        };
        record_incident(empires, galaxy, turn, target, spy, kind);
        reports.push(format!(
            "{} の諜報員 {} 名が {} で捕らえられました。",
            name_of(empires, spy),
            captured,
            name_of(empires, target)
        ));
    }

    if succeeded {
        let report = match mission {
            SpyMission::Espionage => steal_tech(empires, galaxy, catalog, turn, spy, target, rng),
            SpyMission::Sabotage => sabotage(empires, galaxy, turn, spy, target),
            SpyMission::Hide => None,
        };
        reports.extend(report);
    }
    reports
}

fn steal_tech(
    empires: &mut [EmpireState],
    galaxy: &Galaxy,
    catalog: &TechCatalog,
    turn: u32,
    spy: EmpireId,
    target: EmpireId,
    rng: &mut StdRng,
) -> Option<String> {
    let owner = empires.get(spy.0)?;
    let network = &owner.view(target)?.spies;
    let unknown = |ids: &[TechId]| {
        ids.iter()
            .filter(|id| !owner.tech.knows(id))
            .cloned()
            .collect::<Vec<_>>()
    };
    let war_techs = unknown(&network.war_techs);
    let pool = if owner.is_at_war_with(target) && !war_techs.is_empty() {
        war_techs
    } else {
        unknown(&network.stealable_techs)
    };
    let stolen = pool.choose(&mut *rng)?.clone();
    let scapegoat = choose_scapegoat(empires, galaxy, spy, target, rng);

    let owner = empires.get_mut(spy.0)?;
    if !owner.learn_tech(catalog, &stolen) {
        return None;
    }
    if let Some(view) = owner.view_mut(target) {
        view.spies.stealable_techs.retain(|id| *id != stolen);
        view.spies.war_techs.retain(|id| *id != stolen);
    }
    let tech_name = catalog
        .get(&stolen)
        .map_or_else(|| stolen.to_string(), |tech| tech.name.clone());

    match scapegoat {
        Some(framed) => {
            record_incident(empires, galaxy, turn, target, framed, IncidentKind::Framed);
            Some(format!(
                "{} が {} から {} を盗み出し、{} に罪を着せました。",
                name_of(empires, spy),
                name_of(empires, target),
                tech_name,
                name_of(empires, framed)
            ))
        }
        None => {
            record_incident(empires, galaxy, turn, target, spy, IncidentKind::Espionage);
            Some(format!(
                "{} が {} から {} を盗み出しました。",
                name_of(empires, spy),
                name_of(empires, target),
                tech_name
            ))
        }
    }
}

/// Third empire the victim knows that the thief would rather blame.
fn choose_scapegoat(
    empires: &[EmpireState],
    galaxy: &Galaxy,
    spy: EmpireId,
    victim: EmpireId,
    rng: &mut StdRng,
) -> Option<EmpireId> {
    let candidates = empires
        .get(victim.0)?
        .contacted()
        .filter(|id| *id != spy && empires.get(id.0).is_some_and(EmpireState::is_active))
        .collect::<Vec<_>>();
    let (&first, rest) = candidates.split_first()?;
    if !rng.gen_bool(FRAME_CHANCE) {
        return None;
    }
    Some(
        rest.iter()
            .fold(first, |best, &other| suggest_to_frame(empires, galaxy, spy, best, other)),
    )
}

fn sabotage(
    empires: &mut [EmpireState],
    galaxy: &mut Galaxy,
    turn: u32,
    spy: EmpireId,
    target: EmpireId,
) -> Option<String> {
    let owner = empires.get(spy.0)?;
    let network = &owner.view(target)?.spies;
    let kind = best_sabotage_choice(network, owner.is_at_war_with(target))?;
    let system = best_system_for_sabotage(network, kind)?;

    let star = galaxy.system_mut(system)?;
    let system_name = star.name.clone();
    let colony = star.colony.as_mut()?;
    if colony.owner != target {
        return None;
    }
    let detail = match kind {
        SabotageKind::MissileBases => {
            let lost = ((f64::from(colony.missile_bases) * MISSILE_BASE_LOSS).ceil() as u32)
                .max(1)
                .min(colony.missile_bases);
            if lost == 0 {
                return None;
            }
            colony.missile_bases -= lost;
            format!("ミサイル基地 {} 基を破壊", lost)
        }
        SabotageKind::Factories => {
            let lost = colony.factories * FACTORY_LOSS;
            colony.factories -= lost;
            format!("工場 {:.0} を破壊", lost)
        }
        SabotageKind::Rebellion => {
            colony.rebellion = true;
            "反乱を扇動".to_string()
        }
    };

    record_incident(empires, galaxy, turn, target, spy, IncidentKind::Sabotage);
    Some(format!(
        "{} の諜報員が {} ({}) で{}しました。",
        name_of(empires, spy),
        system_name,
        name_of(empires, target),
        detail
    ))
}

fn record_incident(
    empires: &mut [EmpireState],
    galaxy: &Galaxy,
    turn: u32,
    victim: EmpireId,
    perpetrator: EmpireId,
    kind: IncidentKind,
) {
    let severity = incident_severity(empires, galaxy, victim, perpetrator, kind);
    if let Some(view) = empires
        .get_mut(victim.0)
        .and_then(|empire| empire.view_mut(perpetrator))
    {
        view.embassy.add_incident(Incident {
            turn,
            kind,
            perpetrator,
            severity,
            turns_remaining: INCIDENT_TURNS,
        });
    }
}

/// How badly `victim` takes an incident blamed on `perpetrator`.
pub fn incident_severity(
    empires: &[EmpireState],
    galaxy: &Galaxy,
    victim: EmpireId,
    perpetrator: EmpireId,
    kind: IncidentKind,
) -> f64 {
    let base = match kind {
        IncidentKind::Espionage => 10.0,
        IncidentKind::Sabotage => 20.0,
        IncidentKind::Framed => 10.0,
    };
    let Some(victim) = empires.get(victim.0) else {
        return base;
    };
    match victim.leader.objective {
        Objective::Diplomat | Objective::Expansionist => {
            base * (1.0 + normalized_power(empires, galaxy, perpetrator))
        }
        Objective::Militarist if kind == IncidentKind::Sabotage => base * 1.5,
        Objective::Technologist if kind != IncidentKind::Sabotage => base * 1.5,
        _ => base,
    }
}

/// Position of `empire` between the weakest (0) and strongest (1) active empire.
fn normalized_power(empires: &[EmpireState], galaxy: &Galaxy, empire: EmpireId) -> f64 {
    let powers = empires
        .iter()
        .filter(|candidate| candidate.is_active())
        .map(|candidate| (candidate.id, candidate.industrial_power_level(galaxy)))
        .collect::<Vec<_>>();
    let Some(power) = powers
        .iter()
        .find(|(id, _)| *id == empire)
        .map(|(_, power)| *power)
    else {
        return 0.0;
    };
    let min = powers.iter().map(|(_, power)| *power).fold(f64::INFINITY, f64::min);
    let max = powers
        .iter()
        .map(|(_, power)| *power)
        .fold(f64::NEG_INFINITY, f64::max);
    let spread = max - min;
    if !spread.is_finite() || spread < 1e-9 {
        return 0.0;
    }
    ((power - min) / spread).clamp(0.0, 1.0)
}

fn name_of(empires: &[EmpireState], id: EmpireId) -> String {
    empires
        .get(id.0)
        .map_or_else(|| "不明な帝国".to_string(), |empire| empire.name.clone())
}
