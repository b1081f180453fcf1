use std::collections::BTreeMap;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::embassy::EmpireView;
use super::galaxy::Galaxy;
use super::tech::{EmpireTech, TechCatalog, TechEffect};
use super::{EmpireId, MAX_SECURITY_LEVEL, TechId, TechInclusion};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmpireDefinition {
    pub name: String,
    pub race: String,
    #[serde(default)]
    pub player: bool,
    pub personality: Personality,
    pub objective: Objective,
    #[serde(default)]
    pub reserve: f64,
    #[serde(default = "default_research_share")]
    pub research_share: f64,
    #[serde(default = "default_multiplier")]
    pub research_cost_modifier: f64,
    #[serde(default = "default_discovery_pct")]
    pub discovery_pct: f64,
    #[serde(default = "default_ship_range")]
    pub ship_range: f64,
    #[serde(default = "default_scanner_range")]
    pub scanner_range: f64,
}

fn default_research_share() -> f64 {
    0.3
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_discovery_pct() -> f64 {
    0.5
}

fn default_ship_range() -> f64 {
    6.0
}

fn default_scanner_range() -> f64 {
    3.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    Erratic,
    Pacifist,
    Honorable,
    Ruthless,
    Aggressive,
    Xenophobic,
}

impl Personality {
    pub fn label(self) -> &'static str {
        match self {
            Personality::Erratic => "気まぐれ",
            Personality::Pacifist => "平和主義",
            Personality::Honorable => "高潔",
            Personality::Ruthless => "冷酷",
            Personality::Aggressive => "好戦的",
            Personality::Xenophobic => "排他的",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Militarist,
    Ecologist,
    Diplomat,
    Industrialist,
    Expansionist,
    Technologist,
}

impl Objective {
    pub fn label(self) -> &'static str {
        match self {
            Objective::Militarist => "軍国主義",
            Objective::Ecologist => "環境主義",
            Objective::Diplomat => "外交家",
            Objective::Industrialist => "産業主義",
            Objective::Expansionist => "拡張主義",
            Objective::Technologist => "技術主義",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leader {
    pub personality: Personality,
    pub objective: Objective,
}

impl Leader {
    pub fn is_xenophobic(&self) -> bool {
        self.personality == Personality::Xenophobic
    }

    pub fn is_technologist(&self) -> bool {
        self.objective == Objective::Technologist
    }
}

/// Bonuses accumulated from race and learned techs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmpireModifiers {
    pub research_cost: f64,
    pub research_bonus: f64,
    pub industry_bonus: f64,
    pub ground_defense: f64,
    pub shield: f64,
    pub population_bonus: f64,
    pub ship_range: f64,
    pub ship_speed: f64,
    pub weapon_damage: f64,
    pub scanner_range: f64,
}

impl EmpireModifiers {
    fn from_definition(definition: &EmpireDefinition) -> Self {
        Self {
            research_cost: definition.research_cost_modifier,
            research_bonus: 0.0,
            industry_bonus: 0.0,
            ground_defense: 0.0,
            shield: 0.0,
            population_bonus: 0.0,
            ship_range: definition.ship_range,
            ship_speed: 1.0,
            weapon_damage: 0.0,
            scanner_range: definition.scanner_range,
        }
    }

    pub fn apply(&mut self, effect: TechEffect) {
        match effect {
            TechEffect::ResearchBonus { amount } => self.research_bonus += amount,
            TechEffect::ScannerRange { amount } => self.scanner_range += amount,
            TechEffect::IndustryBonus { amount } => self.industry_bonus += amount,
            TechEffect::GroundDefense { amount } => self.ground_defense += amount,
            TechEffect::Shield { amount } => self.shield += amount,
            TechEffect::PopulationBonus { amount } => self.population_bonus += amount,
            TechEffect::ShipRange { amount } => self.ship_range += amount,
            TechEffect::ShipSpeed { amount } => self.ship_speed += amount,
            TechEffect::WeaponDamage { amount } => self.weapon_damage += amount,
            TechEffect::Inert => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpireState {
    pub id: EmpireId,
    pub name: String,
    pub race: String,
    pub is_player: bool,
    pub extinct: bool,
    pub leader: Leader,
    pub reserve: f64,
    pub research_share: f64,
    pub modifiers: EmpireModifiers,
    pub tech: EmpireTech,
    pub views: BTreeMap<EmpireId, EmpireView>,
    internal_security: i32,
}

impl EmpireState {
    pub(crate) fn new(
        id: EmpireId,
        definition: EmpireDefinition,
        catalog: &TechCatalog,
        inclusion: TechInclusion,
        rng: &mut StdRng,
    ) -> Self {
        let tech = EmpireTech::new(catalog, definition.discovery_pct, inclusion, rng);
        let mut modifiers = EmpireModifiers::from_definition(&definition);
        for category in tech.categories() {
            for known in category.known_techs() {
                if let Some(tech) = catalog.get(known) {
                    modifiers.apply(tech.effect);
                }
            }
        }
        Self {
            id,
            name: definition.name,
            race: definition.race,
            is_player: definition.player,
            extinct: false,
            leader: Leader {
                personality: definition.personality,
                objective: definition.objective,
            },
            reserve: definition.reserve.max(0.0),
            research_share: definition.research_share.clamp(0.0, 1.0),
            modifiers,
            tech,
            views: BTreeMap::new(),
            internal_security: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.extinct
    }

    pub fn internal_security(&self) -> i32 {
        self.internal_security
    }

    pub fn set_internal_security(&mut self, level: i32) {
        self.internal_security = level.clamp(0, MAX_SECURITY_LEVEL);
    }

    pub fn total_production(&self, galaxy: &Galaxy) -> f64 {
        galaxy.production_of(self.id) * (1.0 + self.modifiers.industry_bonus)
    }

    pub fn total_research_points(&self, galaxy: &Galaxy) -> f64 {
        self.total_production(galaxy) * self.research_share * (1.0 + self.modifiers.research_bonus)
    }

    /// Production weighted by technological breadth. Never zero.
    pub fn industrial_power_level(&self, galaxy: &Galaxy) -> f64 {
        let breadth = 1.0 + 0.01 * self.tech.known_count() as f64;
        (self.total_production(galaxy) * breadth).max(f64::EPSILON)
    }

    /// Learns a tech and applies its effect on first discovery.
    pub fn learn_tech(&mut self, catalog: &TechCatalog, id: &TechId) -> bool {
        if !self.tech.learn_tech(catalog, id) {
            return false;
        }
        if let Some(tech) = catalog.get(id) {
            self.modifiers.apply(tech.effect);
            info!(empire = %self.name, tech = %tech.name, "技術を獲得しました");
        }
        true
    }

    pub fn view(&self, other: EmpireId) -> Option<&EmpireView> {
        self.views.get(&other)
    }

    pub fn view_mut(&mut self, other: EmpireId) -> Option<&mut EmpireView> {
        self.views.get_mut(&other)
    }

    pub fn has_contact(&self, other: EmpireId) -> bool {
        self.view(other).is_some_and(|view| view.embassy.contact)
    }

    pub fn is_at_war_with(&self, other: EmpireId) -> bool {
        self.view(other).is_some_and(|view| view.embassy.is_at_war())
    }

    pub fn is_allied_with(&self, other: EmpireId) -> bool {
        self.view(other).is_some_and(|view| view.embassy.is_allied())
    }

    pub fn contacted(&self) -> impl Iterator<Item = EmpireId> + '_ {
        self.views
            .values()
            .filter(|view| view.embassy.contact)
            .map(|view| view.target)
    }

    pub fn in_economic_range(&self, other: EmpireId, galaxy: &Galaxy) -> bool {
        galaxy.min_distance_between(self.id, other) <= self.modifiers.ship_range
    }
}
