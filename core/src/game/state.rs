use anyhow::{Result, anyhow, ensure};
use rand::rngs::StdRng;

use super::{
    bootstrap::{GameBootstrap, GameBuilder, ScenarioDefinition},
    combat::CombatResolver,
    embassy::{EmpireView, SpyMission, TreatyStatus},
    empire::EmpireState,
    events::{EventContext, EventNotice, PiratesEvent, RandomEventKind, RandomEvents},
    galaxy::Galaxy,
    ids::{EmpireId, TechId},
    options::GameOptions,
    systems::{diplomacy, facade::SystemsFacade, facade::World},
    tech::{TechCatalog, TechDomain},
};
use crate::{ScheduledTask, Scheduler, StarDate, TurnClock};

pub struct GameState {
    pub(crate) clock: TurnClock,
    pub(crate) scheduler: Scheduler,
    pub(crate) rng: StdRng,
    pub(crate) options: GameOptions,
    pub(crate) catalog: TechCatalog,
    pub(crate) empires: Vec<EmpireState>,
    pub(crate) galaxy: Galaxy,
    pub(crate) events: RandomEvents,
    pub(crate) notices: Vec<EventNotice>,
    pub(crate) combat: Box<dyn CombatResolver>,
    pub(crate) player: EmpireId,
    pub(crate) systems: SystemsFacade,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnStatus {
    pub turn: u32,
    pub star_date: StarDate,
    pub next_task_turn: Option<u32>,
    pub event_chance: f64,
    pub active_events: Vec<RandomEventKind>,
}

impl GameState {
    pub fn from_scenario(scenario: ScenarioDefinition) -> Result<Self> {
        GameBuilder::new(scenario).build()
    }

    pub fn from_scenario_with_seed(scenario: ScenarioDefinition, seed: u64) -> Result<Self> {
        GameBuilder::new(scenario).with_seed(seed).build()
    }

    pub(crate) fn new(bootstrap: GameBootstrap) -> Self {
        Self {
            clock: TurnClock::new(),
            scheduler: bootstrap.scheduler,
            rng: bootstrap.rng,
            options: bootstrap.options,
            catalog: bootstrap.catalog,
            empires: bootstrap.empires,
            galaxy: bootstrap.galaxy,
            events: RandomEvents::new(),
            notices: Vec::new(),
            combat: bootstrap.combat,
            player: bootstrap.player,
            systems: SystemsFacade::new(),
        }
    }

    pub fn turn(&self) -> u32 {
        self.clock.turn()
    }

    pub fn star_date(&self) -> StarDate {
        self.clock.star_date()
    }

    pub fn turn_status(&self) -> TurnStatus {
        TurnStatus {
            turn: self.clock.turn(),
            star_date: self.clock.star_date(),
            next_task_turn: self.scheduler.peek_next_turn(),
            event_chance: self.events.event_chance(),
            active_events: self.events.active().to_vec(),
        }
    }

    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    pub fn catalog(&self) -> &TechCatalog {
        &self.catalog
    }

    pub fn empires(&self) -> &[EmpireState] {
        &self.empires
    }

    pub fn empire(&self, id: EmpireId) -> Result<&EmpireState> {
        self.empires
            .get(id.0)
            .ok_or_else(|| anyhow!("指定された帝国の番号が無効です: {}", id.0 + 1))
    }

    pub fn player(&self) -> EmpireId {
        self.player
    }

    pub fn galaxy(&self) -> &Galaxy {
        &self.galaxy
    }

    pub fn random_events(&self) -> &RandomEvents {
        &self.events
    }

    pub fn notices(&self) -> &[EventNotice] {
        &self.notices
    }

    pub fn pirates(&self) -> Option<&PiratesEvent> {
        self.events
            .instance(RandomEventKind::Pirates)
            .and_then(|event| event.as_pirates())
    }

    pub fn set_combat_resolver(&mut self, combat: impl CombatResolver + 'static) {
        self.combat = Box::new(combat);
    }

    #[cfg(test)]
    pub(crate) fn empires_mut(&mut self) -> &mut [EmpireState] {
        &mut self.empires
    }

    /// Resolves a 1-based number or a case-insensitive empire name.
    pub fn find_empire_index(&self, name_or_index: &str) -> Option<EmpireId> {
        if let Ok(id) = name_or_index.parse::<usize>() {
            if id > 0 && id <= self.empires.len() {
                return Some(EmpireId(id - 1));
            }
        }
        self.empires
            .iter()
            .find(|empire| empire.name.eq_ignore_ascii_case(name_or_index))
            .map(|empire| empire.id)
    }

    /// Sets a category's research ticks, rebalancing the others. Returns the
    /// ticks actually applied.
    pub fn set_allocation(&mut self, empire: EmpireId, domain: TechDomain, ticks: i32) -> Result<i32> {
        let empire = self.empire_mut(empire)?;
        empire.tech.adjust_allocation(domain, ticks)
    }

    pub fn set_allocation_locked(&mut self, empire: EmpireId, domain: TechDomain, locked: bool) -> Result<()> {
        self.empire_mut(empire)?.tech.set_locked(domain, locked);
        Ok(())
    }

    pub fn set_research_target(&mut self, empire: EmpireId, domain: TechDomain, id: &TechId) -> Result<()> {
        let catalog = &self.catalog;
        let empire = self
            .empires
            .get_mut(empire.0)
            .ok_or_else(|| anyhow!("指定された帝国の番号が無効です: {}", empire.0 + 1))?;
        empire.tech.set_research_target(catalog, domain, id)
    }

    /// Changes the treaty between two empires. Returns `false` when it was
    /// already in place.
    pub fn set_treaty(&mut self, a: EmpireId, b: EmpireId, status: TreatyStatus) -> Result<bool> {
        ensure!(a != b, "自国と条約を結ぶことはできません");
        let owner = self.empire(a)?;
        self.empire(b)?;
        ensure!(
            owner.has_contact(b),
            "{} はまだ {} と接触していません",
            owner.name,
            self.empires[b.0].name
        );
        Ok(diplomacy::set_treaty(&mut self.empires, a, b, status))
    }

    pub fn set_spy_mission(&mut self, owner: EmpireId, target: EmpireId, mission: SpyMission) -> Result<()> {
        let view = self.view_mut(owner, target)?;
        view.spies.mission = mission;
        Ok(())
    }

    pub fn set_spy_allocation(&mut self, owner: EmpireId, target: EmpireId, ticks: i32) -> Result<i32> {
        let view = self.view_mut(owner, target)?;
        view.spies.set_allocation(ticks);
        Ok(view.spies.allocation)
    }

    pub fn set_internal_security(&mut self, empire: EmpireId, level: i32) -> Result<i32> {
        let empire = self.empire_mut(empire)?;
        empire.set_internal_security(level);
        Ok(empire.internal_security())
    }

    /// Fires a random event immediately, ignoring chance and minimum turn.
    pub fn force_event(&mut self, kind: RandomEventKind, target: EmpireId) -> Result<Vec<String>> {
        ensure!(
            self.empire(target)?.is_active(),
            "{} はすでに滅亡しています",
            self.empires[target.0].name
        );
        let already = self.notices.len();
        let mut ctx = EventContext {
            turn: self.clock.turn(),
            player: self.player,
            empires: &mut self.empires,
            galaxy: &mut self.galaxy,
            catalog: &self.catalog,
            combat: self.combat.as_mut(),
            rng: &mut self.rng,
            notices: &mut self.notices,
        };
        ensure!(
            self.events.force(kind, target, &mut ctx),
            "{} は現在発生させられません",
            kind
        );
        Ok(self.notices[already..]
            .iter()
            .map(|notice| notice.message.clone())
            .collect())
    }

    /// Runs every phase due this turn and returns the turn's reports.
    pub fn advance_turn(&mut self) -> Vec<String> {
        self.clock.advance();
        let ready = self.scheduler.next_ready_tasks(&self.clock);
        let mut reports = Vec::new();
        for task in ready {
            let mut task_reports = task.execute(self);
            if !task_reports.is_empty() {
                reports.append(&mut task_reports);
            }
        }
        reports.extend(self.update_extinction());
        self.systems.finish_turn();
        reports
    }

    pub fn advance_turns(&mut self, turns: u32) -> Vec<String> {
        let mut reports = Vec::new();
        for _ in 0..turns {
            reports.extend(self.advance_turn());
        }
        reports
    }

    pub(crate) fn process_random_events(&mut self) -> Vec<String> {
        let world = World {
            turn: self.clock.turn(),
            player: self.player,
            options: &self.options,
            empires: &mut self.empires,
            galaxy: &mut self.galaxy,
            catalog: &self.catalog,
            rng: &mut self.rng,
        };
        self.systems.process_random_events(
            &mut self.events,
            world,
            self.combat.as_mut(),
            &mut self.notices,
        )
    }

    pub(crate) fn process_diplomatic_pulse(&mut self) -> Vec<String> {
        self.systems
            .process_diplomatic_pulse(&mut self.empires, &self.galaxy)
    }

    pub(crate) fn process_research(&mut self) -> Vec<String> {
        let world = World {
            turn: self.clock.turn(),
            player: self.player,
            options: &self.options,
            empires: &mut self.empires,
            galaxy: &mut self.galaxy,
            catalog: &self.catalog,
            rng: &mut self.rng,
        };
        self.systems.process_research(world)
    }

    pub(crate) fn process_espionage(&mut self) -> Vec<String> {
        let world = World {
            turn: self.clock.turn(),
            player: self.player,
            options: &self.options,
            empires: &mut self.empires,
            galaxy: &mut self.galaxy,
            catalog: &self.catalog,
            rng: &mut self.rng,
        };
        self.systems.process_espionage(world)
    }

    pub(crate) fn process_security_review(&mut self) -> Vec<String> {
        self.systems
            .process_security_review(&mut self.empires, &self.options)
    }

    /// Empires without colonies drop out of the game.
    fn update_extinction(&mut self) -> Vec<String> {
        let mut reports = Vec::new();
        for empire in self.empires.iter_mut() {
            if empire.extinct || self.galaxy.colonies_of(empire.id).next().is_some() {
                continue;
            }
            empire.extinct = true;
            reports.push(format!("{} は全ての植民地を失い滅亡しました。", empire.name));
        }
        reports
    }

    fn empire_mut(&mut self, id: EmpireId) -> Result<&mut EmpireState> {
        self.empires
            .get_mut(id.0)
            .ok_or_else(|| anyhow!("指定された帝国の番号が無効です: {}", id.0 + 1))
    }

    fn view_mut(&mut self, owner: EmpireId, target: EmpireId) -> Result<&mut EmpireView> {
        ensure!(owner != target, "自国に対して諜報活動はできません");
        self.empire(target)?;
        let empire = self.empire_mut(owner)?;
        let name = empire.name.clone();
        empire
            .view_mut(target)
            .ok_or_else(|| anyhow!("{} は対象の帝国を把握していません", name))
    }
}

impl ScheduledTask {
    pub fn execute(&self, game: &mut GameState) -> Vec<String> {
        super::systems::tasks::execute(self, game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TurnPhase;
    use crate::game::TechId;

    fn sample_scenario() -> ScenarioDefinition {
        ScenarioDefinition::from_json(
            r#"{
            "empires": [
                { "name": "Terran", "race": "Human", "player": true,
                  "personality": "honorable", "objective": "diplomat" },
                { "name": "Klackon", "race": "Klackon",
                  "personality": "aggressive", "objective": "industrialist" },
                { "name": "Mrrshan", "race": "Mrrshan",
                  "personality": "erratic", "objective": "militarist" }
            ],
            "systems": [
                { "name": "Sol", "x": 0.0, "y": 0.0,
                  "colony": { "owner": "Terran", "population": 90.0, "factories": 120.0 } },
                { "name": "Vega", "x": 4.0, "y": 0.0,
                  "colony": { "owner": "Terran", "population": 30.0, "factories": 300.0, "missile_bases": 3 } },
                { "name": "Rigel", "x": 6.0, "y": 0.0,
                  "colony": { "owner": "Klackon", "population": 60.0, "factories": 80.0 } },
                { "name": "Fieras", "x": 40.0, "y": 40.0,
                  "colony": { "owner": "Mrrshan", "population": 50.0, "factories": 60.0 } },
                { "name": "Deneb", "x": 0.0, "y": 9.0 }
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn empires_are_found_by_number_or_name() {
        let game = GameState::from_scenario_with_seed(sample_scenario(), 1).unwrap();
        assert_eq!(game.find_empire_index("2"), Some(EmpireId(1)));
        assert_eq!(game.find_empire_index("mrrshan"), Some(EmpireId(2)));
        assert_eq!(game.find_empire_index("0"), None);
        assert_eq!(game.find_empire_index("Sakkra"), None);
    }

    #[test]
    fn advancing_runs_scheduled_phases() {
        let mut game = GameState::from_scenario_with_seed(sample_scenario(), 2).unwrap();
        game.advance_turn();
        assert_eq!(game.turn(), 1);
        // Rigel sits inside Terran scanner range.
        assert!(game.empires()[0].has_contact(EmpireId(1)));
        assert!(!game.empires()[0].has_contact(EmpireId(2)));
        assert_eq!(game.turn_status().next_task_turn, Some(2));
    }

    #[test]
    fn security_reviews_run_every_fifth_turn() {
        let mut game = GameState::from_scenario_with_seed(sample_scenario(), 3).unwrap();
        game.advance_turns(4);
        assert_eq!(game.empires()[1].internal_security(), 0);
        game.advance_turn();
        assert!(game.empires()[1].internal_security() >= 1);
        assert_eq!(game.empires()[0].internal_security(), 0);
    }

    #[test]
    fn player_commands_validate_their_targets() {
        let mut game = GameState::from_scenario_with_seed(sample_scenario(), 4).unwrap();
        assert!(game
            .set_treaty(EmpireId(0), EmpireId(1), TreatyStatus::War)
            .is_err());
        game.advance_turn();
        assert!(game
            .set_treaty(EmpireId(0), EmpireId(1), TreatyStatus::War)
            .unwrap());
        assert!(game.empires()[1].is_at_war_with(EmpireId(0)));
        assert!(game
            .set_treaty(EmpireId(0), EmpireId(0), TreatyStatus::Pact)
            .is_err());

        assert!(game
            .set_spy_mission(EmpireId(0), EmpireId(1), SpyMission::Sabotage)
            .is_ok());
        assert_eq!(game.set_spy_allocation(EmpireId(0), EmpireId(1), 25).unwrap(), 10);
        assert!(game.set_spy_allocation(EmpireId(0), EmpireId(9), 2).is_err());
        assert_eq!(game.set_internal_security(EmpireId(0), -4).unwrap(), 0);
    }

    #[test]
    fn allocation_changes_keep_the_total() {
        let mut game = GameState::from_scenario_with_seed(sample_scenario(), 5).unwrap();
        let before = game.empires()[0].tech.total_allocation();
        let applied = game
            .set_allocation(EmpireId(0), TechDomain::Weapon, 30)
            .unwrap();
        assert_eq!(applied, 30);
        assert_eq!(game.empires()[0].tech.total_allocation(), before);

        game.set_allocation_locked(EmpireId(0), TechDomain::Weapon, true)
            .unwrap();
        assert!(game.set_allocation(EmpireId(0), TechDomain::Weapon, 0).is_err());
    }

    #[test]
    fn research_target_must_be_available() {
        let mut game = GameState::from_scenario_with_seed(sample_scenario(), 6).unwrap();
        let unknown = TechId::new("no_such_tech");
        assert!(game
            .set_research_target(EmpireId(0), TechDomain::Weapon, &unknown)
            .is_err());
        let available = game.empires()[0]
            .tech
            .category(TechDomain::Weapon)
            .tech_ids_available_for_research(game.catalog());
        let choice = available.last().unwrap().clone();
        game.set_research_target(EmpireId(0), TechDomain::Weapon, &choice)
            .unwrap();
        assert_eq!(
            game.empires()[0].tech.category(TechDomain::Weapon).current_tech(),
            Some(&choice)
        );
    }

    #[test]
    fn forced_donation_reaches_the_treasury() {
        let mut game = GameState::from_scenario_with_seed(sample_scenario(), 7).unwrap();
        let before = game.empires()[1].reserve;
        let reports = game.force_event(RandomEventKind::Donation, EmpireId(1)).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(game.empires()[1].reserve > before);
        assert_eq!(game.notices().len(), 1);
    }

    #[test]
    fn losing_every_colony_means_extinction() {
        let mut game = GameState::from_scenario_with_seed(sample_scenario(), 8).unwrap();
        if let Some(star) = game.galaxy.system_mut(crate::SystemId(3)) {
            star.colony = None;
        }
        let reports = game.advance_turn();
        assert!(game.empires()[2].extinct);
        assert!(reports.iter().any(|report| report.contains("滅亡")));
    }

    #[test]
    fn scheduled_task_dispatches_to_its_phase() {
        let mut game = GameState::from_scenario_with_seed(sample_scenario(), 9).unwrap();
        let task = ScheduledTask::new(TurnPhase::DiplomaticPulse, 0);
        let reports = task.execute(&mut game);
        assert!(reports.iter().any(|report| report.contains("接触")));
        game.empires_mut()[1].set_internal_security(7);
        assert_eq!(game.empires()[1].internal_security(), 7);
    }
}
