use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::StdRng;
use stellar_empires_core::{
    BattleOutcome, CombatResolver, EmpireId, EmpireState, Galaxy, GameState, RaiderProfile,
    RandomEventKind, ScenarioDefinition, SystemId, TreatyStatus, espionage,
};

struct CountingCombat {
    battles: Rc<Cell<u32>>,
}

impl CombatResolver for CountingCombat {
    fn battle(
        &mut self,
        _galaxy: &mut Galaxy,
        _empires: &[EmpireState],
        _system: SystemId,
        _raider: &RaiderProfile,
        _rng: &mut StdRng,
    ) -> BattleOutcome {
        self.battles.set(self.battles.get() + 1);
        BattleOutcome::no_battle()
    }
}

fn two_empire_scenario(sol_bases: u32, treaty: &str) -> ScenarioDefinition {
    let json = format!(
        r#"{{
        "options": {{ "event_start_turn": 1000 }},
        "empires": [
            {{ "name": "Terran", "race": "Human", "player": true,
               "personality": "honorable", "objective": "diplomat" }},
            {{ "name": "Klackon", "race": "Klackon",
               "personality": "aggressive", "objective": "industrialist" }}
        ],
        "systems": [
            {{ "name": "Sol", "x": 0.0, "y": 0.0,
               "colony": {{ "owner": "Terran", "population": 90.0, "factories": 120.0,
                            "missile_bases": {sol_bases} }} }},
            {{ "name": "Rigel", "x": 30.0, "y": 0.0,
               "colony": {{ "owner": "Klackon", "population": 60.0, "factories": 80.0 }} }}
        ],
        "treaties": [ {{ "between": ["Terran", "Klackon"], "status": "{treaty}" }} ]
    }}"#
    );
    ScenarioDefinition::from_json(&json).unwrap()
}

#[test]
fn war_with_one_contact_sets_security_three() {
    let mut game = GameState::from_scenario_with_seed(two_empire_scenario(0, "war"), 4).unwrap();
    assert_eq!(
        espionage::suggested_internal_security_level(game.empires(), EmpireId(1), game.options()),
        3
    );

    game.advance_turns(5);
    let klackon = game.empire(EmpireId(1)).unwrap();
    assert!(klackon.is_at_war_with(EmpireId(0)));
    assert_eq!(klackon.internal_security(), 3);
    // the player chooses their own security
    assert_eq!(game.empire(EmpireId(0)).unwrap().internal_security(), 0);
}

#[test]
fn pirates_pillage_an_undefended_colony_without_combat() {
    let mut game =
        GameState::from_scenario_with_seed(two_empire_scenario(0, "no_treaty"), 9).unwrap();
    let battles = Rc::new(Cell::new(0));
    game.set_combat_resolver(CountingCombat {
        battles: Rc::clone(&battles),
    });

    game.force_event(RandomEventKind::Pirates, EmpireId(0)).unwrap();
    let pirates = game.pirates().unwrap();
    assert_eq!(pirates.target_system(), Some(SystemId(0)));
    assert_eq!(pirates.countdown(), 3);

    let reports = game.advance_turns(3);
    assert_eq!(battles.get(), 0);
    assert!(reports.iter().any(|report| report.contains("略奪")));
    let sol = game.galaxy().system(SystemId(0)).unwrap();
    let colony = sol.colony.as_ref().unwrap();
    assert!((colony.population - 60.0).abs() < 1e-9);
    assert!((colony.factories - 80.0).abs() < 1e-9);
    assert_eq!(sol.event, None);

    // Rigel is the only system in range: 30 parsecs at speed 3
    let pirates = game.pirates().unwrap();
    assert_eq!(pirates.target_system(), Some(SystemId(1)));
    assert_eq!(pirates.countdown(), 10);
    assert!(pirates.fleet().visited.contains(&SystemId(0)));
}

#[test]
fn pirates_fight_a_defended_colony() {
    let mut game =
        GameState::from_scenario_with_seed(two_empire_scenario(4, "no_treaty"), 9).unwrap();
    let battles = Rc::new(Cell::new(0));
    game.set_combat_resolver(CountingCombat {
        battles: Rc::clone(&battles),
    });

    game.force_event(RandomEventKind::Pirates, EmpireId(0)).unwrap();
    game.advance_turns(3);
    assert_eq!(battles.get(), 1);
}

#[test]
fn non_repeatable_events_never_return_to_the_pool() {
    let scenario = ScenarioDefinition::from_json(
        r#"{
        "options": { "event_start_turn": 1, "event_chance_increment": 1.0, "max_event_chance": 1.0 },
        "empires": [
            { "name": "Terran", "race": "Human", "player": true,
              "personality": "honorable", "objective": "diplomat" },
            { "name": "Psilon", "race": "Psilon",
              "personality": "pacifist", "objective": "technologist" }
        ],
        "systems": [
            { "name": "Sol", "x": 0.0, "y": 0.0,
              "colony": { "owner": "Terran", "population": 90.0, "factories": 120.0 } },
            { "name": "Mentar", "x": 20.0, "y": 0.0,
              "colony": { "owner": "Psilon", "population": 70.0, "factories": 90.0 } },
            { "name": "Vega", "x": 10.0, "y": 8.0 }
        ]
    }"#,
    )
    .unwrap();
    let mut game = GameState::from_scenario_with_seed(scenario, 21).unwrap();

    let mut relic_spent = false;
    for _ in 0..300 {
        game.advance_turn();
        let events = game.random_events();
        if events.last_event() == Some(RandomEventKind::PrecursorRelic) {
            assert!(!events.pool().contains(&RandomEventKind::PrecursorRelic));
        }
        // Drawn before its minimum turn or fired, either way it is gone for good.
        if !events.pool().contains(&RandomEventKind::PrecursorRelic) {
            relic_spent = true;
        } else {
            assert!(!relic_spent, "the relic returned to the pool");
        }
        let active = events.active();
        for (idx, kind) in active.iter().enumerate() {
            assert!(!active[idx + 1..].contains(kind), "{kind:?} is running twice");
        }
    }
    assert!(relic_spent);
    assert!(
        game.force_event(RandomEventKind::PrecursorRelic, EmpireId(0))
            .is_err()
    );
}

#[test]
fn treaties_need_contact_and_distinct_empires() {
    let scenario = ScenarioDefinition::from_json(
        r#"{
        "empires": [
            { "name": "Terran", "race": "Human", "player": true,
              "personality": "honorable", "objective": "diplomat" },
            { "name": "Sakkra", "race": "Sakkra",
              "personality": "xenophobic", "objective": "expansionist" }
        ],
        "systems": [
            { "name": "Sol", "x": 0.0, "y": 0.0,
              "colony": { "owner": "Terran", "population": 90.0, "factories": 120.0 } },
            { "name": "Sssla", "x": 80.0, "y": 80.0,
              "colony": { "owner": "Sakkra", "population": 70.0, "factories": 60.0 } }
        ]
    }"#,
    )
    .unwrap();
    let mut game = GameState::from_scenario_with_seed(scenario, 2).unwrap();
    assert!(game.set_treaty(EmpireId(0), EmpireId(0), TreatyStatus::Pact).is_err());
    assert!(game.set_treaty(EmpireId(0), EmpireId(1), TreatyStatus::Pact).is_err());

    game.advance_turns(3);
    assert!(!game.empire(EmpireId(0)).unwrap().has_contact(EmpireId(1)));
}
