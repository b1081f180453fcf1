use tracing::{debug, warn};

use crate::game::embassy::EmpireView;
use crate::game::empire::EmpireState;
use crate::game::galaxy::Galaxy;
use crate::game::{EmpireId, TreatyStatus};

const WAR_THRESHOLD: i32 = -80;
const PEACE_THRESHOLD: i32 = -20;

/// Gives every empire a neutral, uncontacted view of every other empire.
pub(crate) fn initialise_views(empires: &mut [EmpireState]) {
    let ids = empires.iter().map(|empire| empire.id).collect::<Vec<_>>();
    for empire in empires.iter_mut() {
        let own = empire.id;
        empire.views = ids
            .iter()
            .filter(|id| **id != own)
            .map(|id| (*id, EmpireView::new(*id, 0)))
            .collect();
    }
}

pub(crate) fn pulse(empires: &mut [EmpireState], galaxy: &Galaxy) -> Vec<String> {
    let mut reports = Vec::new();
    let len = empires.len();
    for idx in 0..len {
        for other in (idx + 1)..len {
            if !empires[idx].is_active() || !empires[other].is_active() {
                continue;
            }
            let partner = empires[other].id;
            if !empires[idx].has_contact(partner) {
                if let Some(report) = discover(empires, galaxy, idx, other) {
                    reports.push(report);
                }
                continue;
            }

            let Some(relation) = empires[idx]
                .view(partner)
                .map(|view| view.embassy.relations)
            else {
                continue;
            };
            let adjustment = if relation > 75 {
                -1
            } else if relation < -60 {
                2
            } else if relation < 30 {
                1
            } else {
                0
            };
            if adjustment != 0 {
                adjust_bilateral_relation(empires, idx, other, adjustment, adjustment);
                debug!(
                    a = %empires[idx].name,
                    b = %empires[other].name,
                    adjustment,
                    "関係値を調整しました"
                );
            }
            if let Some(report) = review_treaty(empires, idx, other) {
                reports.push(report);
            }
        }
    }

    for empire in empires.iter_mut() {
        for view in empire.views.values_mut() {
            view.embassy.decay_incidents();
        }
    }
    reports
}

/// Establishes contact when either side's scanners reach the other's colonies.
fn discover(empires: &mut [EmpireState], galaxy: &Galaxy, idx: usize, other: usize) -> Option<String> {
    let range = empires[idx]
        .modifiers
        .scanner_range
        .max(empires[other].modifiers.scanner_range);
    if galaxy.min_distance_between(empires[idx].id, empires[other].id) > range {
        return None;
    }
    let (a, b) = pair_mut(empires, idx, other)?;
    let (a_id, b_id) = (a.id, b.id);
    for (owner, target) in [(&mut *a, b_id), (&mut *b, a_id)] {
        if let Some(view) = owner.view_mut(target) {
            view.embassy.contact = true;
        }
    }
    Some(format!("{} と {} が接触しました。", a.name, b.name))
}

/// AI leaders declare war on hated neighbours and make peace once tempers cool.
fn review_treaty(empires: &mut [EmpireState], idx: usize, other: usize) -> Option<String> {
    let (a, b) = (&empires[idx], &empires[other]);
    let a_view = a.view(b.id)?;
    let b_view = b.view(a.id)?;
    let at_war = a_view.embassy.is_at_war();
    let (a_id, b_id) = (a.id, b.id);

    if !at_war {
        let hostile = |owner: &EmpireState, view: &EmpireView| {
            !owner.is_player
                && view.embassy.relations <= WAR_THRESHOLD
                && !view.embassy.is_allied()
                && view.embassy.status != TreatyStatus::Unity
        };
        let aggressor = if hostile(a, a_view) {
            a_id
        } else if hostile(b, b_view) {
            b_id
        } else {
            return None;
        };
        let defender = if aggressor == a_id { b_id } else { a_id };
        set_treaty(empires, aggressor, defender, TreatyStatus::War);
        return Some(format!(
            "{} が {} に宣戦布告しました。",
            empires[aggressor.0].name, empires[defender.0].name
        ));
    }

    let weary = !a.is_player
        && !b.is_player
        && a_view.embassy.relations >= PEACE_THRESHOLD
        && b_view.embassy.relations >= PEACE_THRESHOLD;
    if !weary {
        return None;
    }
    set_treaty(empires, a_id, b_id, TreatyStatus::NoTreaty);
    Some(format!(
        "{} と {} が停戦しました。",
        empires[a_id.0].name, empires[b_id.0].name
    ))
}

/// Sets the treaty on both sides. Returns `false` when nothing changed.
pub(crate) fn set_treaty(
    empires: &mut [EmpireState],
    a: EmpireId,
    b: EmpireId,
    status: TreatyStatus,
) -> bool {
    let Some((left, right)) = pair_mut(empires, a.0, b.0) else {
        warn!(a = a.0, b = b.0, "条約を設定できる帝国の組ではありません");
        return false;
    };
    let mut changed = false;
    let (left_id, right_id) = (left.id, right.id);
    for (owner, target) in [(&mut *left, right_id), (&mut *right, left_id)] {
        if let Some(view) = owner.view_mut(target) {
            changed |= view.embassy.status != status;
            view.embassy.status = status;
        }
    }
    changed
}

pub(crate) fn adjust_bilateral_relation(
    empires: &mut [EmpireState],
    idx_a: usize,
    idx_b: usize,
    delta_a: i32,
    delta_b: i32,
) {
    let Some((a, b)) = pair_mut(empires, idx_a, idx_b) else {
        warn!(idx_a, idx_b, "同じ帝国同士の相互関係は調整できません");
        return;
    };
    if let Some(view) = a.view_mut(b.id) {
        view.embassy.adjust_relations(delta_a);
    }
    if let Some(view) = b.view_mut(a.id) {
        view.embassy.adjust_relations(delta_b);
    }
}

fn pair_mut(
    empires: &mut [EmpireState],
    idx_a: usize,
    idx_b: usize,
) -> Option<(&mut EmpireState, &mut EmpireState)> {
    if idx_a == idx_b || idx_a >= empires.len() || idx_b >= empires.len() {
        return None;
    }
    if idx_a < idx_b {
        let (left, right) = empires.split_at_mut(idx_b);
        Some((&mut left[idx_a], &mut right[0]))
    } else {
        let (left, right) = empires.split_at_mut(idx_a);
        Some((&mut right[0], &mut left[idx_b]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::embassy::{Incident, IncidentKind};
    use crate::game::events::test_support::Fixture;

    const TERRAN: EmpireId = EmpireId(0);
    const KLACKON: EmpireId = EmpireId(1);

    fn fixture() -> Fixture {
        let mut fixture = Fixture::new(8);
        initialise_views(&mut fixture.empires);
        fixture
    }

    fn relation(fixture: &Fixture, owner: EmpireId, target: EmpireId) -> i32 {
        fixture.empires[owner.0]
            .view(target)
            .unwrap()
            .embassy
            .relations
    }

    #[test]
    fn views_cover_every_other_empire() {
        let fixture = fixture();
        assert_eq!(fixture.empires[0].views.len(), 1);
        assert!(fixture.empires[0].view(KLACKON).is_some());
        assert!(fixture.empires[0].view(TERRAN).is_none());
    }

    #[test]
    fn contact_needs_scanner_range() {
        let mut fixture = fixture();
        // Vega and Rigel are 8 apart.
        fixture.empires[0].modifiers.scanner_range = 3.0;
        fixture.empires[1].modifiers.scanner_range = 3.0;
        assert!(pulse(&mut fixture.empires, &fixture.galaxy).is_empty());
        assert!(!fixture.empires[0].has_contact(KLACKON));

        fixture.empires[1].modifiers.scanner_range = 8.0;
        let reports = pulse(&mut fixture.empires, &fixture.galaxy);
        assert_eq!(reports.len(), 1);
        assert!(fixture.empires[0].has_contact(KLACKON));
        assert!(fixture.empires[1].has_contact(TERRAN));
    }

    #[test]
    fn relations_drift_toward_the_middle() {
        let mut fixture = fixture();
        for (owner, target, value) in [(TERRAN, KLACKON, 90), (KLACKON, TERRAN, 90)] {
            let view = fixture.empires[owner.0].view_mut(target).unwrap();
            view.embassy.contact = true;
            view.embassy.relations = value;
        }
        pulse(&mut fixture.empires, &fixture.galaxy);
        assert_eq!(relation(&fixture, TERRAN, KLACKON), 89);
        assert_eq!(relation(&fixture, KLACKON, TERRAN), 89);
    }

    #[test]
    fn hated_neighbours_go_to_war_and_later_make_peace() {
        let mut fixture = fixture();
        fixture.empires[0].is_player = false;
        for (owner, target) in [(TERRAN, KLACKON), (KLACKON, TERRAN)] {
            let view = fixture.empires[owner.0].view_mut(target).unwrap();
            view.embassy.contact = true;
            view.embassy.relations = -95;
        }
        let reports = pulse(&mut fixture.empires, &fixture.galaxy);
        assert!(fixture.empires[0].is_at_war_with(KLACKON));
        assert!(fixture.empires[1].is_at_war_with(TERRAN));
        assert_eq!(reports.len(), 1);

        for (owner, target) in [(TERRAN, KLACKON), (KLACKON, TERRAN)] {
            fixture.empires[owner.0]
                .view_mut(target)
                .unwrap()
                .embassy
                .relations = 0;
        }
        pulse(&mut fixture.empires, &fixture.galaxy);
        assert!(!fixture.empires[0].is_at_war_with(KLACKON));
    }

    #[test]
    fn the_player_is_never_dragged_out_of_war() {
        let mut fixture = fixture();
        for (owner, target) in [(TERRAN, KLACKON), (KLACKON, TERRAN)] {
            let view = fixture.empires[owner.0].view_mut(target).unwrap();
            view.embassy.contact = true;
            view.embassy.relations = 10;
        }
        assert!(set_treaty(&mut fixture.empires, TERRAN, KLACKON, TreatyStatus::War));
        assert!(!set_treaty(&mut fixture.empires, TERRAN, KLACKON, TreatyStatus::War));
        pulse(&mut fixture.empires, &fixture.galaxy);
        assert!(fixture.empires[1].is_at_war_with(TERRAN));
    }

    #[test]
    fn incidents_expire_during_the_pulse() {
        let mut fixture = fixture();
        fixture.empires[0]
            .view_mut(KLACKON)
            .unwrap()
            .embassy
            .add_incident(Incident {
                turn: 1,
                kind: IncidentKind::Espionage,
                perpetrator: KLACKON,
                severity: 5.0,
                turns_remaining: 1,
            });
        fixture.empires[0].modifiers.scanner_range = 0.0;
        fixture.empires[1].modifiers.scanner_range = 0.0;
        pulse(&mut fixture.empires, &fixture.galaxy);
        assert!(fixture.empires[0]
            .view(KLACKON)
            .unwrap()
            .embassy
            .incidents
            .is_empty());
    }

    #[test]
    fn bilateral_adjustment_ignores_self_pairs() {
        let mut fixture = fixture();
        adjust_bilateral_relation(&mut fixture.empires, 1, 0, 5, -3);
        assert_eq!(relation(&fixture, KLACKON, TERRAN), 5);
        assert_eq!(relation(&fixture, TERRAN, KLACKON), -3);
        adjust_bilateral_relation(&mut fixture.empires, 1, 1, 5, 5);
        assert_eq!(relation(&fixture, KLACKON, TERRAN), 5);
    }
}
