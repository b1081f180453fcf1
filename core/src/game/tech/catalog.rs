use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

use crate::game::{LEVELS_PER_BAND, QUINTILE_BANDS, TECH_CATEGORY_COUNT, TechId};

const EMBEDDED_TECHS: &str = include_str!("../../../../config/techs.yaml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechDomain {
    Computer,
    Construction,
    ForceField,
    Planetology,
    Propulsion,
    Weapon,
}

impl TechDomain {
    pub const ALL: [TechDomain; TECH_CATEGORY_COUNT] = [
        TechDomain::Computer,
        TechDomain::Construction,
        TechDomain::ForceField,
        TechDomain::Planetology,
        TechDomain::Propulsion,
        TechDomain::Weapon,
    ];

    pub fn index(self) -> usize {
        match self {
            TechDomain::Computer => 0,
            TechDomain::Construction => 1,
            TechDomain::ForceField => 2,
            TechDomain::Planetology => 3,
            TechDomain::Propulsion => 4,
            TechDomain::Weapon => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TechDomain::Computer => "コンピュータ",
            TechDomain::Construction => "建設",
            TechDomain::ForceField => "フォースフィールド",
            TechDomain::Planetology => "惑星学",
            TechDomain::Propulsion => "推進",
            TechDomain::Weapon => "兵器",
        }
    }

    /// Accepts the snake_case key, the Japanese label or a 1-based index.
    pub fn from_token(token: &str) -> Option<Self> {
        if let Ok(number) = token.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|idx| Self::ALL.get(idx).copied());
        }
        let needle = token.to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|domain| domain.key() == needle || domain.label() == token)
    }

    fn key(self) -> &'static str {
        match self {
            TechDomain::Computer => "computer",
            TechDomain::Construction => "construction",
            TechDomain::ForceField => "force_field",
            TechDomain::Planetology => "planetology",
            TechDomain::Propulsion => "propulsion",
            TechDomain::Weapon => "weapon",
        }
    }
}

impl fmt::Display for TechDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TechEffect {
    ResearchBonus { amount: f64 },
    ScannerRange { amount: f64 },
    IndustryBonus { amount: f64 },
    GroundDefense { amount: f64 },
    Shield { amount: f64 },
    PopulationBonus { amount: f64 },
    ShipRange { amount: f64 },
    ShipSpeed { amount: f64 },
    WeaponDamage { amount: f64 },
    #[serde(rename = "none")]
    Inert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tech {
    pub id: TechId,
    pub name: String,
    pub domain: TechDomain,
    pub level: u32,
    pub free: bool,
    pub restricted: bool,
    pub effect: TechEffect,
}

impl Tech {
    /// Band of five levels the tech falls into, 1..=20.
    pub fn quintile(&self) -> u32 {
        quintile_of(self.level)
    }

    pub fn has_combat_value(&self) -> bool {
        matches!(
            self.effect,
            TechEffect::GroundDefense { .. }
                | TechEffect::Shield { .. }
                | TechEffect::ShipSpeed { .. }
                | TechEffect::WeaponDamage { .. }
        )
    }

    pub fn is_researchable(&self) -> bool {
        !self.free && !self.restricted
    }
}

pub(crate) fn quintile_of(level: u32) -> u32 {
    level.div_ceil(LEVELS_PER_BAND).clamp(1, QUINTILE_BANDS)
}

#[derive(Debug, Clone, Deserialize)]
struct TechEntry {
    id: String,
    name: String,
    level: u32,
    #[serde(default)]
    free: bool,
    #[serde(default)]
    restricted: bool,
    effect: TechEffect,
}

#[derive(Debug, Clone, Default)]
pub struct TechCatalog {
    techs: BTreeMap<TechId, Tech>,
    by_domain: BTreeMap<TechDomain, Vec<TechId>>,
}

impl TechCatalog {
    pub fn from_embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED_TECHS).context("組み込み技術定義の読み込みに失敗しました")
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: BTreeMap<TechDomain, Vec<TechEntry>> =
            serde_yaml::from_str(content).context("技術定義 YAML の解析に失敗しました")?;
        let mut catalog = TechCatalog::default();
        for (domain, entries) in file {
            for entry in entries {
                catalog.insert(domain, entry)?;
            }
        }
        for ids in catalog.by_domain.values_mut() {
            let techs = &catalog.techs;
            ids.sort_by(|a, b| {
                let level_a = techs.get(a).map_or(0, |tech| tech.level);
                let level_b = techs.get(b).map_or(0, |tech| tech.level);
                level_a.cmp(&level_b).then_with(|| a.cmp(b))
            });
        }
        Ok(catalog)
    }

    fn insert(&mut self, domain: TechDomain, entry: TechEntry) -> Result<()> {
        ensure!(
            (1..=100).contains(&entry.level),
            "技術 {} のレベルは 1〜100 で指定してください: {}",
            entry.id,
            entry.level
        );
        ensure!(
            !(entry.free && entry.restricted),
            "技術 {} に free と restricted を同時に指定することはできません",
            entry.id
        );
        let id = TechId::new(entry.id);
        ensure!(
            !self.techs.contains_key(&id),
            "技術 ID が重複しています: {}",
            id
        );
        let tech = Tech {
            id: id.clone(),
            name: entry.name,
            domain,
            level: entry.level,
            free: entry.free,
            restricted: entry.restricted,
            effect: entry.effect,
        };
        self.techs.insert(id.clone(), tech);
        self.by_domain.entry(domain).or_default().push(id);
        Ok(())
    }

    pub fn get(&self, id: &TechId) -> Option<&Tech> {
        self.techs.get(id)
    }

    pub fn require(&self, id: &TechId) -> Result<&Tech> {
        self.get(id)
            .ok_or_else(|| anyhow!("未知の技術 ID です: {}", id))
    }

    /// Techs of one domain ordered by level, then id.
    pub fn domain_techs(&self, domain: TechDomain) -> impl Iterator<Item = &Tech> + '_ {
        self.by_domain
            .get(&domain)
            .into_iter()
            .flatten()
            .filter_map(|id| self.techs.get(id))
    }

    pub fn free_techs(&self, domain: TechDomain) -> Vec<TechId> {
        self.domain_techs(domain)
            .filter(|tech| tech.free)
            .map(|tech| tech.id.clone())
            .collect()
    }

    pub fn restricted_techs(&self, domain: TechDomain) -> Vec<TechId> {
        self.domain_techs(domain)
            .filter(|tech| tech.restricted)
            .map(|tech| tech.id.clone())
            .collect()
    }

    pub fn level_of(&self, id: &TechId) -> u32 {
        self.get(id).map_or(0, |tech| tech.level)
    }

    pub fn bands_with_researchable(&self, domain: TechDomain) -> BTreeSet<u32> {
        self.domain_techs(domain)
            .filter(|tech| tech.is_researchable())
            .map(Tech::quintile)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.techs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techs.is_empty()
    }
}
