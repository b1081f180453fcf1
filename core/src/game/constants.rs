pub(crate) const MAX_RELATION: i32 = 100;
pub(crate) const MIN_RELATION: i32 = -100;

pub(crate) const MAX_ALLOCATION_TICKS: i32 = 60;
pub(crate) const TECH_CATEGORY_COUNT: usize = 6;
pub(crate) const QUINTILE_BANDS: u32 = 20;
pub(crate) const LEVELS_PER_BAND: u32 = 5;
pub(crate) const MAX_NON_ENDGAME_BAND: u32 = 19;
pub(crate) const BASE_RESEARCH_COST: f64 = 25.0;
pub(crate) const RESEARCH_INTEREST_RATE: f64 = 0.25;
pub(crate) const MAX_RESEARCH_COST_MODIFIER: f64 = 10.0;

pub(crate) const MAX_SECURITY_LEVEL: i32 = 10;
pub(crate) const MAX_SPY_ALLOCATION: i32 = 10;
pub(crate) const SPY_SPENDING_PER_TICK: f64 = 0.005;
pub(crate) const BASE_SPY_COST: f64 = 25.0;
pub(crate) const SPY_COST_PER_SECURITY: f64 = 5.0;

pub(crate) const PIRATE_APPROACH_TURNS: u32 = 3;
pub(crate) const PIRATE_SEARCH_PASSES: u32 = 10;
pub(crate) const PIRATE_NEARBY_SYSTEMS: usize = 10;
pub(crate) const PIRATE_SPEED: f64 = 3.0;
pub(crate) const PIRATE_PLUNDER_PER_TURN: f64 = 50.0;
pub(crate) const PIRATE_PILLAGE_SHARE: f64 = 1.0 / 3.0;

pub(crate) const FACTORY_OUTPUT: f64 = 1.0;
pub(crate) const POPULATION_OUTPUT: f64 = 0.5;
pub(crate) const SECURITY_REVIEW_TURNS: u32 = 5;
