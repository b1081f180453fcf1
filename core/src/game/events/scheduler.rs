use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{EventContext, EventProgress, RandomEvent, RandomEventKind};
use crate::game::{EmpireId, GameOptions};

/// Galaxy-wide random event scheduler. Owns the pool of kinds that may still
/// fire, the kinds currently running and one reusable instance per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomEvents {
    pool: Vec<RandomEventKind>,
    active: Vec<RandomEventKind>,
    instances: BTreeMap<RandomEventKind, RandomEvent>,
    event_chance: f64,
    last_event: Option<RandomEventKind>,
}

impl Default for RandomEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomEvents {
    pub fn new() -> Self {
        Self {
            pool: RandomEventKind::ALL.to_vec(),
            active: Vec::new(),
            instances: BTreeMap::new(),
            event_chance: 0.0,
            last_event: None,
        }
    }

    pub fn pool(&self) -> &[RandomEventKind] {
        &self.pool
    }

    pub fn active(&self) -> &[RandomEventKind] {
        &self.active
    }

    pub fn event_chance(&self) -> f64 {
        self.event_chance
    }

    pub fn last_event(&self) -> Option<RandomEventKind> {
        self.last_event
    }

    pub fn instance(&self, kind: RandomEventKind) -> Option<&RandomEvent> {
        self.instances.get(&kind)
    }

    /// Advances running events, then may fire one new event.
    pub fn next_turn(&mut self, options: &GameOptions, ctx: &mut EventContext<'_>) {
        if !options.random_events_enabled {
            return;
        }
        self.advance_active(ctx);

        if ctx.turn < options.event_start_turn || self.pool.is_empty() {
            return;
        }
        self.event_chance =
            (self.event_chance + options.event_chance_increment).min(options.max_event_chance);
        if ctx.rng.r#gen::<f64>() >= self.event_chance {
            return;
        }

        let Some(&kind) = self.pool.choose(&mut *ctx.rng) else {
            return;
        };
        // A drawn non-repeatable kind is spent even when the gates below refuse it.
        if !kind.repeatable() {
            self.pool.retain(|candidate| *candidate != kind);
        }
        if ctx.turn < kind.minimum_turn()
            || self.last_event == Some(kind)
            || self.active.contains(&kind)
        {
            debug!(?kind, turn = ctx.turn, "イベント候補が条件を満たしませんでした");
            return;
        }

        let target = select_target_empire(ctx, kind.good_event());
        self.start(kind, target, ctx);
    }

    /// Fires `kind` against `target`, bypassing chance and gating. Returns
    /// `false` when the kind is no longer in the pool or already running.
    pub fn force(
        &mut self,
        kind: RandomEventKind,
        target: EmpireId,
        ctx: &mut EventContext<'_>,
    ) -> bool {
        if !self.pool.contains(&kind) || self.active.contains(&kind) {
            return false;
        }
        self.start(kind, target, ctx);
        true
    }

    fn start(&mut self, kind: RandomEventKind, target: EmpireId, ctx: &mut EventContext<'_>) {
        if !kind.repeatable() {
            self.pool.retain(|candidate| *candidate != kind);
        }
        self.event_chance = 0.0;
        self.last_event = Some(kind);
        info!(?kind, target = target.0, turn = ctx.turn, "ランダムイベントが発生しました");

        let event = self
            .instances
            .entry(kind)
            .or_insert_with(|| RandomEvent::new(kind));
        if event.trigger(target, ctx) == EventProgress::Ongoing && !self.active.contains(&kind) {
            self.active.push(kind);
        }
    }

    fn advance_active(&mut self, ctx: &mut EventContext<'_>) {
        let running = self.active.clone();
        for kind in running {
            let progress = match self.instances.get_mut(&kind) {
                Some(event) => event.next_turn(ctx),
                None => EventProgress::Finished,
            };
            if progress == EventProgress::Finished {
                self.active.retain(|candidate| *candidate != kind);
            }
        }
    }
}

/// Weighted draw over the surviving empires. Bad events favour the strong,
/// good events the weak. Falls back to the player.
pub(crate) fn select_target_empire(ctx: &mut EventContext<'_>, good_event: bool) -> EmpireId {
    let weights = ctx
        .empires
        .iter()
        .filter(|empire| empire.is_active())
        .map(|empire| {
            let power = empire.industrial_power_level(ctx.galaxy);
            let weight = if good_event { 1.0 / power } else { power };
            (empire.id, weight)
        })
        .filter(|(_, weight)| weight.is_finite() && *weight > 0.0)
        .collect::<Vec<_>>();

    let total: f64 = weights.iter().map(|(_, weight)| weight).sum();
    if weights.is_empty() || !total.is_finite() || total <= 0.0 {
        return ctx.player;
    }
    let roll = ctx.rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (id, weight) in &weights {
        cumulative += weight;
        if roll < cumulative {
            return *id;
        }
    }
    ctx.player
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::test_support::Fixture;

    fn always_options() -> GameOptions {
        GameOptions {
            event_start_turn: 1,
            event_chance_increment: 1.0,
            max_event_chance: 1.0,
            ..GameOptions::default()
        }
    }

    #[test]
    fn nothing_happens_before_the_start_turn() {
        let mut fixture = Fixture::new(1);
        let mut events = RandomEvents::new();
        let options = GameOptions::default();
        for turn in 1..50 {
            let mut ctx = fixture.context(turn);
            events.next_turn(&options, &mut ctx);
        }
        assert_eq!(events.event_chance(), 0.0);
        assert!(events.last_event().is_none());
    }

    #[test]
    fn disabled_events_do_not_tick() {
        let mut fixture = Fixture::new(1);
        let mut events = RandomEvents::new();
        let options = GameOptions {
            random_events_enabled: false,
            ..always_options()
        };
        let mut ctx = fixture.context(100);
        events.next_turn(&options, &mut ctx);
        assert!(events.last_event().is_none());
    }

    #[test]
    fn chance_grows_to_the_cap() {
        let mut fixture = Fixture::new(1);
        let mut events = RandomEvents::new();
        events.pool = vec![RandomEventKind::Plague];
        let options = GameOptions::default();
        // The plague cannot fire before turn 60, so the chance only grows.
        for turn in 50..60 {
            let mut ctx = fixture.context(turn);
            events.next_turn(&options, &mut ctx);
        }
        assert!((events.event_chance() - options.max_event_chance).abs() < 1e-12);
    }

    #[test]
    fn non_repeatable_event_leaves_the_pool() {
        let mut fixture = Fixture::new(2);
        let mut events = RandomEvents::new();
        events.pool = vec![RandomEventKind::PrecursorRelic];
        let options = always_options();
        let mut ctx = fixture.context(80);
        events.next_turn(&options, &mut ctx);
        assert_eq!(events.last_event(), Some(RandomEventKind::PrecursorRelic));
        assert!(events.pool().is_empty());
        assert_eq!(events.event_chance(), 0.0);

        for turn in 81..90 {
            let mut ctx = fixture.context(turn);
            events.next_turn(&options, &mut ctx);
        }
        assert!(!events.pool().contains(&RandomEventKind::PrecursorRelic));
    }

    #[test]
    fn gated_non_repeatable_pick_still_leaves_the_pool() {
        let mut fixture = Fixture::new(2);
        let mut events = RandomEvents::new();
        events.pool = vec![RandomEventKind::PrecursorRelic];
        let options = always_options();
        let mut ctx = fixture.context(60);
        events.next_turn(&options, &mut ctx);
        assert!(events.pool().is_empty());
        assert!(events.last_event().is_none());
        assert!(fixture.notices.is_empty());
    }

    #[test]
    fn the_same_kind_never_fires_twice_in_a_row() {
        let mut fixture = Fixture::new(6);
        let mut events = RandomEvents::new();
        events.pool = vec![RandomEventKind::Donation];
        events.last_event = Some(RandomEventKind::Donation);
        let options = always_options();
        for turn in 10..20 {
            let mut ctx = fixture.context(turn);
            events.next_turn(&options, &mut ctx);
        }
        assert!(fixture.notices.is_empty());
        assert_eq!(events.pool(), &[RandomEventKind::Donation]);
        assert_eq!(events.event_chance(), 1.0);
    }

    #[test]
    fn running_event_is_not_triggered_again() {
        let mut fixture = Fixture::new(3);
        let mut events = RandomEvents::new();
        events.pool = vec![RandomEventKind::Pirates, RandomEventKind::Donation];
        let options = always_options();
        {
            let mut ctx = fixture.context(60);
            assert!(events.force(RandomEventKind::Pirates, EmpireId(0), &mut ctx));
        }
        assert_eq!(events.active(), &[RandomEventKind::Pirates]);
        {
            let mut ctx = fixture.context(60);
            assert!(!events.force(RandomEventKind::Pirates, EmpireId(0), &mut ctx));
        }
        for turn in 61..64 {
            let mut ctx = fixture.context(turn);
            events.next_turn(&options, &mut ctx);
            assert!(events.active().iter().filter(|k| **k == RandomEventKind::Pirates).count() <= 1);
        }
    }

    #[test]
    fn bad_events_prefer_the_industrial_powerhouse() {
        let mut fixture = Fixture::new(4);
        let mut hits = [0usize; 2];
        for _ in 0..400 {
            let mut ctx = fixture.context(70);
            let target = select_target_empire(&mut ctx, false);
            hits[target.0] += 1;
        }
        assert!(hits[0] > hits[1]);
    }

    #[test]
    fn good_events_prefer_the_weaker_empire() {
        let mut fixture = Fixture::new(4);
        let mut hits = [0usize; 2];
        for _ in 0..400 {
            let mut ctx = fixture.context(70);
            let target = select_target_empire(&mut ctx, true);
            hits[target.0] += 1;
        }
        // Klackon produces a fraction of what Terran does.
        assert!(hits[1] > hits[0]);
    }
}
