mod accident;
mod donation;
mod pirates;
mod plague;
mod relic;
mod scheduler;

use std::fmt;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::combat::CombatResolver;
use super::empire::EmpireState;
use super::galaxy::Galaxy;
use super::tech::TechCatalog;
use super::{EmpireId, SystemId};

pub use accident::AccidentEvent;
pub use donation::DonationEvent;
pub use pirates::{PirateFleet, PiratesEvent};
pub use plague::PlagueEvent;
pub use relic::RelicEvent;
pub use scheduler::RandomEvents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomEventKind {
    Donation,
    PrecursorRelic,
    Plague,
    IndustrialAccident,
    Pirates,
}

impl RandomEventKind {
    pub const ALL: [RandomEventKind; 5] = [
        RandomEventKind::Donation,
        RandomEventKind::PrecursorRelic,
        RandomEventKind::Plague,
        RandomEventKind::IndustrialAccident,
        RandomEventKind::Pirates,
    ];

    pub fn minimum_turn(self) -> u32 {
        match self {
            RandomEventKind::Donation => 1,
            RandomEventKind::PrecursorRelic => 75,
            RandomEventKind::Plague => 60,
            RandomEventKind::IndustrialAccident => 55,
            RandomEventKind::Pirates => 50,
        }
    }

    pub fn repeatable(self) -> bool {
        !matches!(self, RandomEventKind::PrecursorRelic)
    }

    pub fn good_event(self) -> bool {
        matches!(
            self,
            RandomEventKind::Donation | RandomEventKind::PrecursorRelic
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            RandomEventKind::Donation => "寄付",
            RandomEventKind::PrecursorRelic => "先史文明の遺物",
            RandomEventKind::Plague => "疫病",
            RandomEventKind::IndustrialAccident => "産業事故",
            RandomEventKind::Pirates => "宇宙海賊",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "donation" => Some(RandomEventKind::Donation),
            "relic" | "precursor_relic" => Some(RandomEventKind::PrecursorRelic),
            "plague" => Some(RandomEventKind::Plague),
            "accident" | "industrial_accident" => Some(RandomEventKind::IndustrialAccident),
            "pirates" => Some(RandomEventKind::Pirates),
            _ => None,
        }
    }
}

impl fmt::Display for RandomEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventProgress {
    Ongoing,
    Finished,
}

/// Player-visible message raised by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNotice {
    pub turn: u32,
    pub message: String,
    pub icon_key: String,
}

/// Everything an event may read or mutate while it runs.
pub struct EventContext<'a> {
    pub turn: u32,
    pub player: EmpireId,
    pub empires: &'a mut [EmpireState],
    pub galaxy: &'a mut Galaxy,
    pub catalog: &'a TechCatalog,
    pub combat: &'a mut dyn CombatResolver,
    pub rng: &'a mut StdRng,
    pub notices: &'a mut Vec<EventNotice>,
}

impl EventContext<'_> {
    pub fn notify_random_event(&mut self, message: String, icon_key: &str) {
        info!(turn = self.turn, icon = icon_key, "{message}");
        self.notices.push(EventNotice {
            turn: self.turn,
            message,
            icon_key: icon_key.to_string(),
        });
    }

    pub fn empire_name(&self, id: EmpireId) -> &str {
        self.empires
            .get(id.0)
            .map_or("不明な帝国", |empire| empire.name.as_str())
    }

    pub fn system_name(&self, id: SystemId) -> &str {
        self.galaxy
            .system(id)
            .map_or("不明な星系", |system| system.name.as_str())
    }
}

/// One instance per kind, reused across triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RandomEvent {
    Donation(DonationEvent),
    PrecursorRelic(RelicEvent),
    Plague(PlagueEvent),
    IndustrialAccident(AccidentEvent),
    Pirates(PiratesEvent),
}

impl RandomEvent {
    pub fn new(kind: RandomEventKind) -> Self {
        match kind {
            RandomEventKind::Donation => RandomEvent::Donation(DonationEvent),
            RandomEventKind::PrecursorRelic => RandomEvent::PrecursorRelic(RelicEvent),
            RandomEventKind::Plague => RandomEvent::Plague(PlagueEvent::default()),
            RandomEventKind::IndustrialAccident => {
                RandomEvent::IndustrialAccident(AccidentEvent)
            }
            RandomEventKind::Pirates => RandomEvent::Pirates(PiratesEvent::default()),
        }
    }

    pub fn kind(&self) -> RandomEventKind {
        match self {
            RandomEvent::Donation(_) => RandomEventKind::Donation,
            RandomEvent::PrecursorRelic(_) => RandomEventKind::PrecursorRelic,
            RandomEvent::Plague(_) => RandomEventKind::Plague,
            RandomEvent::IndustrialAccident(_) => RandomEventKind::IndustrialAccident,
            RandomEvent::Pirates(_) => RandomEventKind::Pirates,
        }
    }

    pub fn minimum_turn(&self) -> u32 {
        self.kind().minimum_turn()
    }

    pub fn repeatable(&self) -> bool {
        self.kind().repeatable()
    }

    pub fn good_event(&self) -> bool {
        self.kind().good_event()
    }

    /// Starts the event against `target`. Returns `Ongoing` when it must be
    /// advanced on later turns.
    pub fn trigger(&mut self, target: EmpireId, ctx: &mut EventContext<'_>) -> EventProgress {
        match self {
            RandomEvent::Donation(event) => event.trigger(target, ctx),
            RandomEvent::PrecursorRelic(event) => event.trigger(target, ctx),
            RandomEvent::Plague(event) => event.trigger(target, ctx),
            RandomEvent::IndustrialAccident(event) => event.trigger(target, ctx),
            RandomEvent::Pirates(event) => event.trigger(target, ctx),
        }
    }

    pub fn next_turn(&mut self, ctx: &mut EventContext<'_>) -> EventProgress {
        match self {
            RandomEvent::Plague(event) => event.next_turn(ctx),
            RandomEvent::Pirates(event) => event.next_turn(ctx),
            RandomEvent::Donation(_)
            | RandomEvent::PrecursorRelic(_)
            | RandomEvent::IndustrialAccident(_) => EventProgress::Finished,
        }
    }

    pub fn as_pirates(&self) -> Option<&PiratesEvent> {
        match self {
            RandomEvent::Pirates(event) => Some(event),
            _ => None,
        }
    }
}
