use serde::{Deserialize, Serialize};

use super::{EventContext, EventProgress};
use crate::game::EmpireId;

const FACTORY_LOSS: f64 = 0.2;

/// Destroys a fifth of the factories at the empire's largest industrial world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccidentEvent;

impl AccidentEvent {
    pub fn trigger(&mut self, target: EmpireId, ctx: &mut EventContext<'_>) -> EventProgress {
        let site = ctx
            .galaxy
            .colonies_of(target)
            .filter(|system| system.factories() > 0.0)
            .max_by(|a, b| {
                a.factories()
                    .total_cmp(&b.factories())
                    .then_with(|| b.id.cmp(&a.id))
            })
            .map(|system| system.id);
        let Some(site) = site else {
            return EventProgress::Finished;
        };
        let mut lost = 0.0;
        if let Some(colony) = ctx
            .galaxy
            .system_mut(site)
            .and_then(|system| system.colony.as_mut())
        {
            lost = (colony.factories * FACTORY_LOSS).ceil();
            colony.factories = (colony.factories - lost).max(0.0);
        }
        let message = format!(
            "{} の {} で産業事故が発生し、工場 {:.0} 基が失われました。",
            ctx.empire_name(target),
            ctx.system_name(site),
            lost
        );
        ctx.notify_random_event(message, "industrial_accident");
        EventProgress::Finished
    }
}
