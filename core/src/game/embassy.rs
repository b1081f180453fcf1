use serde::{Deserialize, Serialize};

use super::{EmpireId, MAX_RELATION, MAX_SPY_ALLOCATION, MIN_RELATION, SystemId, TechId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatyStatus {
    #[default]
    NoTreaty,
    Pact,
    Alliance,
    War,
    Unity,
}

impl TreatyStatus {
    pub fn label(self) -> &'static str {
        match self {
            TreatyStatus::NoTreaty => "条約なし",
            TreatyStatus::Pact => "不可侵条約",
            TreatyStatus::Alliance => "同盟",
            TreatyStatus::War => "戦争",
            TreatyStatus::Unity => "統一",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "none" | "no_treaty" | "peace" => Some(TreatyStatus::NoTreaty),
            "pact" => Some(TreatyStatus::Pact),
            "alliance" => Some(TreatyStatus::Alliance),
            "war" => Some(TreatyStatus::War),
            "unity" => Some(TreatyStatus::Unity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentKind {
    Espionage,
    Sabotage,
    Framed,
}

impl IncidentKind {
    pub fn label(self) -> &'static str {
        match self {
            IncidentKind::Espionage => "諜報",
            IncidentKind::Sabotage => "破壊工作",
            IncidentKind::Framed => "濡れ衣",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub turn: u32,
    pub kind: IncidentKind,
    pub perpetrator: EmpireId,
    pub severity: f64,
    pub turns_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embassy {
    pub contact: bool,
    pub status: TreatyStatus,
    pub relations: i32,
    pub incidents: Vec<Incident>,
}

impl Embassy {
    pub fn new(relations: i32) -> Self {
        Self {
            contact: false,
            status: TreatyStatus::NoTreaty,
            relations: relations.clamp(MIN_RELATION, MAX_RELATION),
            incidents: Vec::new(),
        }
    }

    pub fn is_at_war(&self) -> bool {
        self.status == TreatyStatus::War
    }

    pub fn has_no_treaty(&self) -> bool {
        self.status == TreatyStatus::NoTreaty
    }

    pub fn is_allied(&self) -> bool {
        matches!(self.status, TreatyStatus::Alliance | TreatyStatus::Unity)
    }

    pub fn adjust_relations(&mut self, delta: i32) {
        self.relations = (self.relations + delta).clamp(MIN_RELATION, MAX_RELATION);
    }

    /// Records an incident and lowers relations by its severity.
    pub fn add_incident(&mut self, incident: Incident) {
        self.adjust_relations(-(incident.severity.round() as i32));
        self.incidents.push(incident);
    }

    pub fn decay_incidents(&mut self) {
        for incident in self.incidents.iter_mut() {
            incident.turns_remaining = incident.turns_remaining.saturating_sub(1);
        }
        self.incidents.retain(|incident| incident.turns_remaining > 0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpyMission {
    #[default]
    Hide,
    Sabotage,
    Espionage,
}

impl SpyMission {
    pub fn label(self) -> &'static str {
        match self {
            SpyMission::Hide => "潜伏",
            SpyMission::Sabotage => "破壊工作",
            SpyMission::Espionage => "技術窃取",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "hide" => Some(SpyMission::Hide),
            "sabotage" => Some(SpyMission::Sabotage),
            "espionage" | "steal" => Some(SpyMission::Espionage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SabotageKind {
    MissileBases,
    Factories,
    Rebellion,
}

/// Spies one empire keeps on another, with the targets they have scouted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpyNetwork {
    pub allocation: i32,
    pub mission: SpyMission,
    pub active_spies: u32,
    pub spy_bc: f64,
    pub base_targets: Vec<SystemId>,
    pub factory_targets: Vec<SystemId>,
    pub rebellion_targets: Vec<SystemId>,
    pub stealable_techs: Vec<TechId>,
    pub war_techs: Vec<TechId>,
}

impl SpyNetwork {
    pub fn set_allocation(&mut self, ticks: i32) {
        self.allocation = ticks.clamp(0, MAX_SPY_ALLOCATION);
    }

    pub fn can_steal(&self) -> bool {
        !self.stealable_techs.is_empty()
    }

    pub fn can_steal_war_tech(&self) -> bool {
        !self.war_techs.is_empty()
    }

    pub fn can_sabotage(&self) -> bool {
        !self.base_targets.is_empty()
            || !self.factory_targets.is_empty()
            || !self.rebellion_targets.is_empty()
    }
}

/// What one empire knows about and maintains toward another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpireView {
    pub target: EmpireId,
    pub embassy: Embassy,
    pub spies: SpyNetwork,
}

impl EmpireView {
    pub fn new(target: EmpireId, relations: i32) -> Self {
        Self {
            target,
            embassy: Embassy::new(relations),
            spies: SpyNetwork::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incidents_lower_relations_and_expire() {
        let mut embassy = Embassy::new(10);
        embassy.add_incident(Incident {
            turn: 3,
            kind: IncidentKind::Espionage,
            perpetrator: EmpireId(1),
            severity: 14.6,
            turns_remaining: 2,
        });
        assert_eq!(embassy.relations, -5);
        embassy.decay_incidents();
        assert_eq!(embassy.incidents.len(), 1);
        embassy.decay_incidents();
        assert!(embassy.incidents.is_empty());
    }

    #[test]
    fn relations_stay_in_range() {
        let mut embassy = Embassy::new(95);
        embassy.adjust_relations(40);
        assert_eq!(embassy.relations, MAX_RELATION);
        embassy.adjust_relations(-400);
        assert_eq!(embassy.relations, MIN_RELATION);
    }

    #[test]
    fn spy_allocation_is_clamped() {
        let mut network = SpyNetwork::default();
        network.set_allocation(14);
        assert_eq!(network.allocation, MAX_SPY_ALLOCATION);
        network.set_allocation(-1);
        assert_eq!(network.allocation, 0);
    }
}
