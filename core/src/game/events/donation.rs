use serde::{Deserialize, Serialize};

use super::{EventContext, EventProgress};
use crate::game::EmpireId;

const DONATION_SHARE: f64 = 0.5;

/// Sympathetic benefactors hand the empire half a turn of production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationEvent;

impl DonationEvent {
    pub fn trigger(&mut self, target: EmpireId, ctx: &mut EventContext<'_>) -> EventProgress {
        let Some(empire) = ctx.empires.get_mut(target.0) else {
            return EventProgress::Finished;
        };
        let amount = (empire.total_production(ctx.galaxy) * DONATION_SHARE).floor();
        if amount <= 0.0 {
            return EventProgress::Finished;
        }
        empire.reserve += amount;
        let message = format!(
            "{} に匿名の支援者から {:.0} BC の寄付が届きました。",
            empire.name, amount
        );
        ctx.notify_random_event(message, "donation");
        EventProgress::Finished
    }
}
