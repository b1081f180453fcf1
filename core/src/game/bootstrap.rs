use std::collections::BTreeSet;

use anyhow::{Context, Result, anyhow, ensure};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::{
    EmpireId, GameOptions, MAX_RESEARCH_COST_MODIFIER, SECURITY_REVIEW_TURNS,
    combat::{CombatResolver, StrengthCombat},
    embassy::TreatyStatus,
    empire::{EmpireDefinition, EmpireState},
    galaxy::{Galaxy, SystemDefinition},
    state::GameState,
    systems::diplomacy,
    tech::TechCatalog,
};
use crate::{ScheduleSpec, ScheduledTask, Scheduler, TurnPhase};

/// Everything needed to start a game, as stored in `config/scenario.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    #[serde(default)]
    pub options: GameOptions,
    pub empires: Vec<EmpireDefinition>,
    pub systems: Vec<SystemDefinition>,
    #[serde(default)]
    pub treaties: Vec<TreatyDefinition>,
}

impl ScenarioDefinition {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("シナリオの JSON を解析できませんでした")
    }
}

/// Starting relationship between two empires. Listed pairs begin in contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatyDefinition {
    pub between: [String; 2],
    #[serde(default)]
    pub status: TreatyStatus,
    #[serde(default)]
    pub relations: i32,
}

pub struct GameBuilder {
    scenario: ScenarioDefinition,
    catalog: Option<TechCatalog>,
    combat: Box<dyn CombatResolver>,
    rng: StdRng,
}

impl GameBuilder {
    pub fn new(scenario: ScenarioDefinition) -> Self {
        Self {
            scenario,
            catalog: None,
            combat: Box::new(StrengthCombat),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_catalog(mut self, catalog: TechCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_combat_resolver(mut self, combat: impl CombatResolver + 'static) -> Self {
        self.combat = Box::new(combat);
        self
    }

    pub fn build(self) -> Result<GameState> {
        let bootstrap = self.into_bootstrap()?;
        Ok(GameState::new(bootstrap))
    }

    pub(crate) fn into_bootstrap(self) -> Result<GameBootstrap> {
        self.validate_scenario()?;
        let GameBuilder {
            scenario,
            catalog,
            combat,
            mut rng,
        } = self;
        let catalog = match catalog {
            Some(catalog) => catalog,
            None => TechCatalog::from_embedded()?,
        };
        let ScenarioDefinition {
            options,
            empires: definitions,
            systems,
            treaties,
        } = scenario;

        let player = definitions
            .iter()
            .position(|definition| definition.player)
            .map(EmpireId)
            .ok_or_else(|| anyhow!("プレイヤー帝国が定義されていません"))?;
        let mut empires = definitions
            .into_iter()
            .enumerate()
            .map(|(idx, definition)| {
                EmpireState::new(
                    EmpireId(idx),
                    definition,
                    &catalog,
                    options.tech_inclusion,
                    &mut rng,
                )
            })
            .collect::<Vec<_>>();
        let galaxy = Galaxy::from_definitions(systems, |owner| {
            find_by_name(&empires, owner)
                .ok_or_else(|| anyhow!("星系の所有者 {} は定義されていない帝国です", owner))
        })?;

        diplomacy::initialise_views(&mut empires);
        apply_treaties(&mut empires, &treaties)?;

        let mut scheduler = Scheduler::new();
        register_core_tasks(&mut scheduler, 0);

        Ok(GameBootstrap {
            rng,
            scheduler,
            options,
            catalog,
            empires,
            galaxy,
            combat,
            player,
        })
    }

    fn validate_scenario(&self) -> Result<()> {
        let scenario = &self.scenario;
        ensure!(
            !scenario.empires.is_empty(),
            "帝国が1つも定義されていません。最低1件の帝国を用意してください。"
        );
        let players = scenario
            .empires
            .iter()
            .filter(|definition| definition.player)
            .count();
        ensure!(
            players == 1,
            "プレイヤー帝国はちょうど1つ必要です (現在 {} 件)",
            players
        );

        let mut names = BTreeSet::new();
        for definition in &scenario.empires {
            ensure!(
                names.insert(definition.name.to_ascii_lowercase()),
                "帝国名 {} が重複しています",
                definition.name
            );
            ensure!(
                (0.0..=1.0).contains(&definition.discovery_pct),
                "{} の発見率は 0〜1 の範囲で指定してください",
                definition.name
            );
            ensure!(
                definition.research_cost_modifier.is_finite()
                    && definition.research_cost_modifier > 0.0
                    && definition.research_cost_modifier <= MAX_RESEARCH_COST_MODIFIER,
                "{} の研究コスト補正は 0 より大きく {} 以下で指定してください",
                definition.name,
                MAX_RESEARCH_COST_MODIFIER
            );
            ensure!(
                definition.ship_range >= 0.0 && definition.scanner_range >= 0.0,
                "{} の航続距離とスキャナー範囲は負にできません",
                definition.name
            );
        }

        let options = &scenario.options;
        ensure!(
            options.ai_production_modifier.is_finite() && options.ai_production_modifier > 0.0,
            "AI 生産補正は正の値で指定してください"
        );
        ensure!(
            (0.0..=1.0).contains(&options.max_event_chance) && options.event_chance_increment >= 0.0,
            "イベント発生確率の設定が不正です"
        );
        ensure!(!scenario.systems.is_empty(), "星系が1つも定義されていません");
        Ok(())
    }
}

pub(crate) struct GameBootstrap {
    pub(crate) rng: StdRng,
    pub(crate) scheduler: Scheduler,
    pub(crate) options: GameOptions,
    pub(crate) catalog: TechCatalog,
    pub(crate) empires: Vec<EmpireState>,
    pub(crate) galaxy: Galaxy,
    pub(crate) combat: Box<dyn CombatResolver>,
    pub(crate) player: EmpireId,
}

/// Queues every phase for the turns after `after_turn`. Security reviews fall
/// on multiples of the review interval.
pub(crate) fn register_core_tasks(scheduler: &mut Scheduler, after_turn: u32) {
    let next = after_turn + 1;
    for phase in [
        TurnPhase::RandomEvents,
        TurnPhase::DiplomaticPulse,
        TurnPhase::Research,
        TurnPhase::Espionage,
    ] {
        scheduler.schedule(ScheduledTask::new(phase, next).with_schedule(ScheduleSpec::EveryTurn));
    }
    let review = (after_turn / SECURITY_REVIEW_TURNS + 1) * SECURITY_REVIEW_TURNS;
    scheduler.schedule(
        ScheduledTask::new(TurnPhase::SecurityReview, review)
            .with_schedule(ScheduleSpec::EveryTurns(SECURITY_REVIEW_TURNS)),
    );
}

fn apply_treaties(empires: &mut [EmpireState], treaties: &[TreatyDefinition]) -> Result<()> {
    for treaty in treaties {
        let [left, right] = &treaty.between;
        let a = find_by_name(empires, left)
            .ok_or_else(|| anyhow!("条約の当事者 {} は定義されていない帝国です", left))?;
        let b = find_by_name(empires, right)
            .ok_or_else(|| anyhow!("条約の当事者 {} は定義されていない帝国です", right))?;
        ensure!(a != b, "{} は自国と条約を結べません", left);

        diplomacy::set_treaty(empires, a, b, treaty.status);
        for (owner, target) in [(a, b), (b, a)] {
            if let Some(view) = empires[owner.0].view_mut(target) {
                view.embassy.contact = true;
                view.embassy.adjust_relations(treaty.relations);
            }
        }
    }
    Ok(())
}

fn find_by_name(empires: &[EmpireState], name: &str) -> Option<EmpireId> {
    empires
        .iter()
        .find(|empire| empire.name.eq_ignore_ascii_case(name))
        .map(|empire| empire.id)
}
