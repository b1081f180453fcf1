use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EventContext, EventProgress};
use crate::game::tech::TechDomain;
use crate::game::{EmpireId, TechId};

const RELIC_CATEGORIES: usize = 2;

/// Survey teams uncover precursor ruins. Two random categories gain an
/// out-of-tree tech that can be researched regardless of the frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelicEvent;

impl RelicEvent {
    pub fn trigger(&mut self, target: EmpireId, ctx: &mut EventContext<'_>) -> EventProgress {
        let Some(empire) = ctx.empires.get(target.0) else {
            return EventProgress::Finished;
        };
        let mut grants: Vec<(TechDomain, TechId)> = Vec::new();
        for domain in TechDomain::ALL {
            let category = empire.tech.category(domain);
            let candidate = ctx
                .catalog
                .restricted_techs(domain)
                .into_iter()
                .find(|id| !category.knows(id) && !category.bonus_techs().contains(id));
            if let Some(id) = candidate {
                grants.push((domain, id));
            }
        }
        let chosen = grants
            .choose_multiple(&mut *ctx.rng, RELIC_CATEGORIES)
            .cloned()
            .collect::<Vec<_>>();
        if chosen.is_empty() {
            debug!(empire = target.0, "遺物から得られる制限技術が残っていません");
            return EventProgress::Finished;
        }

        let mut names = Vec::new();
        if let Some(empire) = ctx.empires.get_mut(target.0) {
            for (domain, id) in &chosen {
                if empire.tech.category_mut(*domain).add_bonus_tech(id, ctx.catalog) {
                    if let Some(tech) = ctx.catalog.get(id) {
                        names.push(tech.name.clone());
                    }
                }
            }
        }
        let message = format!(
            "{} が先史文明の遺物を発見し、新たな研究対象を得ました: {}",
            ctx.empire_name(target),
            names.join(", ")
        );
        ctx.notify_random_event(message, "precursor_relic");
        EventProgress::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::test_support::Fixture;

    #[test]
    fn relic_grants_bonus_techs_in_two_categories() {
        let mut fixture = Fixture::new(8);
        let mut ctx = fixture.context(80);
        RelicEvent.trigger(EmpireId(1), &mut ctx);
        let bonus = fixture.empires[1]
            .tech
            .categories()
            .iter()
            .filter(|category| !category.bonus_techs().is_empty())
            .count();
        assert_eq!(bonus, 2);
        assert_eq!(fixture.notices.len(), 1);
    }

    #[test]
    fn relic_finishes_quietly_once_restricted_techs_run_out() {
        let mut fixture = Fixture::new(8);
        for _ in 0..10 {
            let mut ctx = fixture.context(80);
            RelicEvent.trigger(EmpireId(1), &mut ctx);
        }
        let granted = fixture.notices.len();
        let mut ctx = fixture.context(80);
        let progress = RelicEvent.trigger(EmpireId(1), &mut ctx);
        assert_eq!(progress, EventProgress::Finished);
        assert_eq!(fixture.notices.len(), granted);
    }
}
