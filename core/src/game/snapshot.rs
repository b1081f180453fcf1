use anyhow::{Context, Result, ensure};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::{
    EmpireId, GameOptions,
    bootstrap::register_core_tasks,
    combat::StrengthCombat,
    empire::EmpireState,
    events::{EventNotice, RandomEvents},
    galaxy::Galaxy,
    state::GameState,
    systems::facade::SystemsFacade,
    tech::TechCatalog,
};
use crate::{Scheduler, TurnClock};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable copy of a game between turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub version: u32,
    pub turn: u32,
    pub rng_seed: u64,
    pub player: EmpireId,
    pub options: GameOptions,
    pub empires: Vec<EmpireState>,
    pub galaxy: Galaxy,
    pub events: RandomEvents,
    pub notices: Vec<EventNotice>,
}

impl GameSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("スナップショットを JSON に変換できませんでした")
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("スナップショットの JSON を解析できませんでした")
    }
}

impl GameState {
    /// Captures the game. The random stream is reseeded from itself so the
    /// live game and any restored copy continue identically.
    pub fn snapshot(&mut self) -> GameSnapshot {
        let rng_seed = self.rng.r#gen::<u64>();
        self.rng = StdRng::seed_from_u64(rng_seed);
        GameSnapshot {
            version: SNAPSHOT_VERSION,
            turn: self.clock.turn(),
            rng_seed,
            player: self.player,
            options: self.options,
            empires: self.empires.clone(),
            galaxy: self.galaxy.clone(),
            events: self.events.clone(),
            notices: self.notices.clone(),
        }
    }

    pub fn restore(snapshot: GameSnapshot) -> Result<Self> {
        Self::restore_with_catalog(snapshot, TechCatalog::from_embedded()?)
    }

    pub fn restore_with_catalog(snapshot: GameSnapshot, catalog: TechCatalog) -> Result<Self> {
        ensure!(
            snapshot.version == SNAPSHOT_VERSION,
            "スナップショットのバージョン {} には対応していません (対応バージョン: {})",
            snapshot.version,
            SNAPSHOT_VERSION
        );
        ensure!(
            snapshot
                .empires
                .get(snapshot.player.0)
                .is_some_and(|empire| empire.is_player),
            "スナップショットのプレイヤー帝国が不正です"
        );
        for empire in &snapshot.empires {
            for category in empire.tech.categories() {
                for id in category.known_techs() {
                    catalog
                        .require(id)
                        .with_context(|| format!("{} の既知技術を復元できません", empire.name))?;
                }
            }
        }

        let mut scheduler = Scheduler::new();
        register_core_tasks(&mut scheduler, snapshot.turn);
        Ok(GameState {
            clock: TurnClock::starting_at(snapshot.turn),
            scheduler,
            rng: StdRng::seed_from_u64(snapshot.rng_seed),
            options: snapshot.options,
            catalog,
            empires: snapshot.empires,
            galaxy: snapshot.galaxy,
            events: snapshot.events,
            notices: snapshot.notices,
            combat: Box::new(StrengthCombat),
            player: snapshot.player,
            systems: SystemsFacade::new(),
        })
    }
}
