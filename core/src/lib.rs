mod game;
mod scheduler;
mod time;

pub use game::{
    BattleOutcome, Colony, ColonyDefinition, CombatResolver, Embassy, EmpireDefinition,
    EmpireId, EmpireModifiers, EmpireState, EmpireTech, EmpireView, EventNotice,
    FleetDefinition, FleetPresence, Galaxy, GameBuilder, GameOptions, GameSnapshot, GameState,
    Incident, IncidentKind, Leader, NearbySystem, Objective, Personality, PirateFleet,
    PiratesEvent, RaiderProfile, RandomEvent, RandomEventKind, RandomEvents, SNAPSHOT_VERSION,
    SabotageKind, ScenarioDefinition, SpyMission, SpyNetwork, StarSystem, StrengthCombat,
    SystemDefinition, SystemEvent, SystemId, Tech, TechCatalog, TechCategory, TechDomain,
    TechEffect, TechId, TechInclusion, TreatyDefinition, TreatyStatus, TurnStatus, espionage,
    intelligence, round_research_cost,
};
pub use scheduler::{ScheduleSpec, ScheduledTask, Scheduler, TurnPhase};
pub use time::{StarDate, TurnClock};
