use rand::rngs::StdRng;

use crate::game::combat::CombatResolver;
use crate::game::empire::EmpireState;
use crate::game::events::{EventContext, EventNotice, RandomEvents};
use crate::game::galaxy::Galaxy;
use crate::game::tech::TechCatalog;
use crate::game::{EmpireId, GameOptions};

use super::{diplomacy, espionage, intelligence, research};

/// Mutable world handed to the facade for one phase.
pub(crate) struct World<'a> {
    pub turn: u32,
    pub player: EmpireId,
    pub options: &'a GameOptions,
    pub empires: &'a mut [EmpireState],
    pub galaxy: &'a mut Galaxy,
    pub catalog: &'a TechCatalog,
    pub rng: &'a mut StdRng,
}

pub(crate) struct SystemsFacade {
    targets_fresh: bool,
}

impl SystemsFacade {
    pub fn new() -> Self {
        Self {
            targets_fresh: false,
        }
    }

    /// Rescans spy targets once per turn. Returns `true` when a scan ran.
    pub fn ensure_targets_refreshed(
        &mut self,
        empires: &mut [EmpireState],
        galaxy: &Galaxy,
        catalog: &TechCatalog,
    ) -> bool {
        if self.targets_fresh {
            return false;
        }
        espionage::refresh_targets(empires, galaxy, catalog);
        self.targets_fresh = true;
        true
    }

    pub fn finish_turn(&mut self) {
        self.targets_fresh = false;
    }

    pub fn process_random_events(
        &mut self,
        events: &mut RandomEvents,
        world: World<'_>,
        combat: &mut dyn CombatResolver,
        notices: &mut Vec<EventNotice>,
    ) -> Vec<String> {
        let already = notices.len();
        let mut ctx = EventContext {
            turn: world.turn,
            player: world.player,
            empires: world.empires,
            galaxy: world.galaxy,
            catalog: world.catalog,
            combat,
            rng: world.rng,
            notices,
        };
        events.next_turn(world.options, &mut ctx);
        ctx.notices[already..]
            .iter()
            .map(|notice| notice.message.clone())
            .collect()
    }

    pub fn process_diplomatic_pulse(
        &mut self,
        empires: &mut [EmpireState],
        galaxy: &Galaxy,
    ) -> Vec<String> {
        diplomacy::pulse(empires, galaxy)
    }

    pub fn process_research(&mut self, world: World<'_>) -> Vec<String> {
        research::allocate_all(world.empires, world.galaxy, world.catalog, world.rng)
    }

    pub fn process_espionage(&mut self, world: World<'_>) -> Vec<String> {
        self.ensure_targets_refreshed(world.empires, world.galaxy, world.catalog);
        espionage::plan(world.empires, world.galaxy, world.options);
        intelligence::resolve_networks(
            world.empires,
            world.galaxy,
            world.catalog,
            world.turn,
            world.rng,
        )
    }

    pub fn process_security_review(
        &mut self,
        empires: &mut [EmpireState],
        options: &GameOptions,
    ) -> Vec<String> {
        espionage::review_security(empires, options)
    }
}
