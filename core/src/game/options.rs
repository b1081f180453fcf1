use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    pub ai_production_modifier: f64,
    pub random_events_enabled: bool,
    pub event_start_turn: u32,
    pub event_chance_increment: f64,
    pub max_event_chance: f64,
    pub tech_inclusion: TechInclusion,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            ai_production_modifier: 1.0,
            random_events_enabled: true,
            event_start_turn: 50,
            event_chance_increment: 0.01,
            max_event_chance: 0.05,
            tech_inclusion: TechInclusion::default(),
        }
    }
}

/// Propulsion techs forced into every research list regardless of the draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechInclusion {
    pub always_star_gates: bool,
    pub always_thorium_cells: bool,
}
