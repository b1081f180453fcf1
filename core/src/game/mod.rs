mod bootstrap;
mod combat;
mod constants;
pub(crate) use constants::*;
mod embassy;
mod empire;
mod events;
mod galaxy;
mod ids;
mod options;
mod snapshot;
mod state;
pub(crate) mod systems;
mod tech;

pub use bootstrap::{GameBuilder, ScenarioDefinition, TreatyDefinition};
pub use combat::{BattleOutcome, CombatResolver, RaiderProfile, StrengthCombat};
pub use embassy::{
    Embassy, EmpireView, Incident, IncidentKind, SabotageKind, SpyMission, SpyNetwork,
    TreatyStatus,
};
pub use empire::{
    EmpireDefinition, EmpireModifiers, EmpireState, Leader, Objective, Personality,
};
pub use events::{
    EventNotice, PirateFleet, PiratesEvent, RandomEvent, RandomEventKind, RandomEvents,
};
pub use galaxy::{
    Colony, ColonyDefinition, FleetDefinition, FleetPresence, Galaxy, NearbySystem,
    StarSystem, SystemDefinition, SystemEvent,
};
pub use ids::{EmpireId, SystemId, TechId};
pub use options::{GameOptions, TechInclusion};
pub use snapshot::{GameSnapshot, SNAPSHOT_VERSION};
pub use state::{GameState, TurnStatus};
pub use systems::{espionage, intelligence};
pub use tech::{
    EmpireTech, Tech, TechCatalog, TechCategory, TechDomain, TechEffect, round_research_cost,
};
