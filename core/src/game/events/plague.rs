use serde::{Deserialize, Serialize};

use super::{EventContext, EventProgress};
use crate::game::galaxy::SystemEvent;
use crate::game::{EmpireId, SystemId};

const PLAGUE_DURATION: u32 = 5;
const POPULATION_LOSS: f64 = 0.05;

/// Strikes the most populous colony and bleeds population for several turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlagueEvent {
    system: Option<SystemId>,
    turns_remaining: u32,
}

impl PlagueEvent {
    pub fn system(&self) -> Option<SystemId> {
        self.system
    }

    pub fn turns_remaining(&self) -> u32 {
        self.turns_remaining
    }

    pub fn trigger(&mut self, target: EmpireId, ctx: &mut EventContext<'_>) -> EventProgress {
        let site = ctx
            .galaxy
            .colonies_of(target)
            .filter_map(|system| system.colony.as_ref().map(|colony| (system.id, colony.population)))
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(id, _)| id);
        let Some(site) = site else {
            return EventProgress::Finished;
        };
        if let Some(system) = ctx.galaxy.system_mut(site) {
            system.event = Some(SystemEvent::Plague);
        }
        self.system = Some(site);
        self.turns_remaining = PLAGUE_DURATION;
        let message = format!(
            "{} の {} で疫病が発生しました。",
            ctx.empire_name(target),
            ctx.system_name(site)
        );
        ctx.notify_random_event(message, "plague");
        EventProgress::Ongoing
    }

    pub fn next_turn(&mut self, ctx: &mut EventContext<'_>) -> EventProgress {
        let Some(site) = self.system else {
            return EventProgress::Finished;
        };
        if let Some(colony) = ctx
            .galaxy
            .system_mut(site)
            .and_then(|system| system.colony.as_mut())
        {
            colony.population *= 1.0 - POPULATION_LOSS;
        }
        self.turns_remaining = self.turns_remaining.saturating_sub(1);
        if self.turns_remaining > 0 {
            return EventProgress::Ongoing;
        }

        if let Some(system) = ctx.galaxy.system_mut(site) {
            if system.event == Some(SystemEvent::Plague) {
                system.event = None;
            }
        }
        self.system = None;
        let message = format!("{} の疫病は終息しました。", ctx.system_name(site));
        ctx.notify_random_event(message, "plague");
        EventProgress::Finished
    }
}
