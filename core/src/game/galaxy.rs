use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use super::{EmpireId, FACTORY_OUTPUT, POPULATION_OUTPUT, SystemId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDefinition {
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub colony: Option<ColonyDefinition>,
    #[serde(default)]
    pub fleets: Vec<FleetDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColonyDefinition {
    pub owner: String,
    pub population: f64,
    pub factories: f64,
    #[serde(default)]
    pub missile_bases: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetDefinition {
    pub owner: String,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    pub owner: EmpireId,
    pub population: f64,
    pub factories: f64,
    pub missile_bases: u32,
    pub rebellion: bool,
}

impl Colony {
    pub fn production(&self) -> f64 {
        let output = self.factories * FACTORY_OUTPUT + self.population * POPULATION_OUTPUT;
        if self.rebellion { output * 0.5 } else { output }
    }
}

/// Marker shown on the map while an event is acting on the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemEvent {
    PiratesApproaching,
    Plague,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetPresence {
    pub owner: EmpireId,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
    pub id: SystemId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub colony: Option<Colony>,
    pub event: Option<SystemEvent>,
    pub fleets: Vec<FleetPresence>,
}

impl StarSystem {
    pub fn owner(&self) -> Option<EmpireId> {
        self.colony.as_ref().map(|colony| colony.owner)
    }

    pub fn is_colonized(&self) -> bool {
        self.colony.is_some()
    }

    pub fn is_defended(&self) -> bool {
        let bases = self
            .colony
            .as_ref()
            .is_some_and(|colony| colony.missile_bases > 0);
        bases || self.fleets.iter().any(|fleet| fleet.strength > 0.0)
    }

    pub fn factories(&self) -> f64 {
        self.colony.as_ref().map_or(0.0, |colony| colony.factories)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbySystem {
    pub id: SystemId,
    pub distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Galaxy {
    systems: Vec<StarSystem>,
}

impl Galaxy {
    pub fn from_definitions<F>(definitions: Vec<SystemDefinition>, resolve_owner: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<EmpireId>,
    {
        let mut systems = Vec::with_capacity(definitions.len());
        for (idx, definition) in definitions.into_iter().enumerate() {
            ensure!(
                definition.x.is_finite() && definition.y.is_finite(),
                "星系 {} の座標が不正です",
                definition.name
            );
            let colony = match definition.colony {
                Some(colony) => {
                    ensure!(
                        colony.population >= 0.0 && colony.factories >= 0.0,
                        "星系 {} の人口・工場数は0以上で指定してください",
                        definition.name
                    );
                    Some(Colony {
                        owner: resolve_owner(&colony.owner)?,
                        population: colony.population,
                        factories: colony.factories,
                        missile_bases: colony.missile_bases,
                        rebellion: false,
                    })
                }
                None => None,
            };
            let mut fleets = Vec::with_capacity(definition.fleets.len());
            for fleet in definition.fleets {
                fleets.push(FleetPresence {
                    owner: resolve_owner(&fleet.owner)?,
                    strength: fleet.strength.max(0.0),
                });
            }
            systems.push(StarSystem {
                id: SystemId(idx),
                name: definition.name,
                x: definition.x,
                y: definition.y,
                colony,
                event: None,
                fleets,
            });
        }
        Ok(Self { systems })
    }

    pub fn systems(&self) -> &[StarSystem] {
        &self.systems
    }

    pub fn system(&self, id: SystemId) -> Option<&StarSystem> {
        self.systems.get(id.0)
    }

    pub fn system_mut(&mut self, id: SystemId) -> Option<&mut StarSystem> {
        self.systems.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn distance(&self, a: SystemId, b: SystemId) -> f64 {
        match (self.system(a), self.system(b)) {
            (Some(a), Some(b)) => ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt(),
            _ => f64::INFINITY,
        }
    }

    /// Up to `limit` other systems ordered by distance, ties by id.
    pub fn nearby_systems(&self, origin: SystemId, limit: usize) -> Vec<NearbySystem> {
        let mut nearby = self
            .systems
            .iter()
            .filter(|system| system.id != origin)
            .map(|system| NearbySystem {
                id: system.id,
                distance: self.distance(origin, system.id),
            })
            .collect::<Vec<_>>();
        nearby.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        nearby.truncate(limit);
        nearby
    }

    pub fn colonies_of(&self, empire: EmpireId) -> impl Iterator<Item = &StarSystem> + '_ {
        self.systems
            .iter()
            .filter(move |system| system.owner() == Some(empire))
    }

    pub fn production_of(&self, empire: EmpireId) -> f64 {
        self.colonies_of(empire)
            .filter_map(|system| system.colony.as_ref())
            .map(Colony::production)
            .sum()
    }

    pub fn population_of(&self, empire: EmpireId) -> f64 {
        self.colonies_of(empire)
            .filter_map(|system| system.colony.as_ref())
            .map(|colony| colony.population)
            .sum()
    }

    /// Distance from the empire's closest colony to `target`.
    pub fn min_colony_distance(&self, empire: EmpireId, target: SystemId) -> f64 {
        self.colonies_of(empire)
            .map(|system| self.distance(system.id, target))
            .fold(f64::INFINITY, f64::min)
    }

    /// Distance between the closest pair of colonies of two empires.
    pub fn min_distance_between(&self, a: EmpireId, b: EmpireId) -> f64 {
        self.colonies_of(b)
            .map(|system| self.min_colony_distance(a, system.id))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn clear_fleets_of(&mut self, system: SystemId) {
        if let Some(system) = self.system_mut(system) {
            system.fleets.clear();
        }
    }
}
