use anyhow::{Result, ensure};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::catalog::{TechCatalog, TechDomain};
use crate::game::{
    BASE_RESEARCH_COST, MAX_ALLOCATION_TICKS, MAX_NON_ENDGAME_BAND, QUINTILE_BANDS,
    RESEARCH_INTEREST_RATE, TechId, TechInclusion,
};

const STAR_GATES: &str = "star_gate";
const THORIUM_CELLS: &str = "thorium_cells";
const MAX_COST_GRANULARITY: f64 = 100_000_000.0;

/// Research state of one technology domain for one empire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechCategory {
    domain: TechDomain,
    allocation: i32,
    current_tech: Option<TechId>,
    known_techs: Vec<TechId>,
    possible_techs: Vec<TechId>,
    bonus_techs: Vec<TechId>,
    total_bc: f64,
    locked: bool,
    research_completed: bool,
    research_started: bool,
}

impl TechCategory {
    pub fn new(
        domain: TechDomain,
        catalog: &TechCatalog,
        discovery_pct: f64,
        inclusion: TechInclusion,
        rng: &mut StdRng,
    ) -> Self {
        let mut category = Self {
            domain,
            allocation: 0,
            current_tech: None,
            known_techs: catalog.free_techs(domain),
            possible_techs: Vec::new(),
            bonus_techs: Vec::new(),
            total_bc: 0.0,
            locked: false,
            research_completed: false,
            research_started: false,
        };
        category.build_research_list(catalog, discovery_pct, inclusion, rng);
        category.select_new_tech(catalog);
        category
    }

    pub fn domain(&self) -> TechDomain {
        self.domain
    }

    pub fn allocation(&self) -> i32 {
        self.allocation
    }

    pub fn set_allocation(&mut self, ticks: i32) {
        self.allocation = ticks.clamp(0, MAX_ALLOCATION_TICKS);
    }

    pub fn allocation_pct(&self) -> f64 {
        f64::from(self.allocation) / f64::from(MAX_ALLOCATION_TICKS)
    }

    pub fn current_tech(&self) -> Option<&TechId> {
        self.current_tech.as_ref()
    }

    pub fn known_techs(&self) -> &[TechId] {
        &self.known_techs
    }

    pub fn possible_techs(&self) -> &[TechId] {
        &self.possible_techs
    }

    pub fn bonus_techs(&self) -> &[TechId] {
        &self.bonus_techs
    }

    pub fn total_bc(&self) -> f64 {
        self.total_bc
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_completed(&self) -> bool {
        self.research_completed
    }

    pub fn research_started(&self) -> bool {
        self.research_started
    }

    pub fn knows(&self, id: &TechId) -> bool {
        self.known_techs.contains(id)
    }

    /// Rolls every researchable tech of the domain into the possible list,
    /// one draw per tech. Bands that draw nothing receive one forced pick.
    pub fn build_research_list(
        &mut self,
        catalog: &TechCatalog,
        discovery_pct: f64,
        inclusion: TechInclusion,
        rng: &mut StdRng,
    ) {
        let chance = if discovery_pct.is_finite() {
            discovery_pct.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.possible_techs.clear();
        for band in 1..=QUINTILE_BANDS {
            let candidates = catalog
                .domain_techs(self.domain)
                .filter(|tech| tech.is_researchable() && tech.quintile() == band)
                .filter(|tech| !self.known_techs.contains(&tech.id))
                .map(|tech| tech.id.clone())
                .collect::<Vec<_>>();
            if candidates.is_empty() {
                continue;
            }
            let mut drawn = candidates
                .iter()
                .filter(|_| rng.gen_bool(chance))
                .cloned()
                .collect::<Vec<_>>();
            if drawn.is_empty() {
                if let Some(forced) = candidates.choose(&mut *rng) {
                    drawn.push(forced.clone());
                }
            }
            self.possible_techs.extend(drawn);
        }

        if self.domain == TechDomain::Propulsion {
            if inclusion.always_star_gates {
                self.force_possible(catalog, &TechId::new(STAR_GATES));
            }
            if inclusion.always_thorium_cells {
                self.force_possible(catalog, &TechId::new(THORIUM_CELLS));
            }
        }
        sort_by_level(&mut self.possible_techs, catalog);
    }

    fn force_possible(&mut self, catalog: &TechCatalog, id: &TechId) {
        if catalog.get(id).is_none() || self.possible_techs.contains(id) || self.knows(id) {
            return;
        }
        self.possible_techs.push(id.clone());
    }

    /// Research points spent on this domain this turn, interest included.
    pub fn current_research(&self, total_rp: f64) -> f64 {
        let base = total_rp.max(0.0) * self.allocation_pct();
        let interest = RESEARCH_INTEREST_RATE * (total_rp.max(0.0) / 6.0).min(base);
        base + interest
    }

    pub fn cost_for_tech(level: u32, cost_modifier: f64) -> f64 {
        let level = f64::from(level);
        let base = BASE_RESEARCH_COST * (1.0 + level / 100.0);
        round_research_cost(base * level * level * cost_modifier)
    }

    pub fn discovery_chance(total_bc: f64, cost: f64) -> f64 {
        if total_bc <= cost {
            return 0.0;
        }
        if cost <= 0.0 {
            return 1.0;
        }
        ((total_bc - cost) / (cost * 2.0)).min(1.0)
    }

    /// Spends this turn's research and rolls for a breakthrough. Returns the
    /// tech to learn; the owning empire applies it through `learn_tech`.
    pub fn allocate_research_bc(
        &mut self,
        total_rp: f64,
        catalog: &TechCatalog,
        cost_modifier: f64,
        rng: &mut StdRng,
    ) -> Option<TechId> {
        if self.research_completed {
            return None;
        }
        self.ensure_valid_current_tech(catalog);
        if self.current_tech.is_none() && self.select_new_tech(catalog).is_none() {
            return None;
        }

        let spending = self.current_research(total_rp);
        if spending > 0.0 {
            self.research_started = true;
            self.total_bc += spending;
        }

        let current = self.current_tech.clone()?;
        let cost = Self::cost_for_tech(catalog.level_of(&current), cost_modifier);
        let chance = Self::discovery_chance(self.total_bc, cost);
        if chance <= 0.0 {
            return None;
        }
        let roll = rng.r#gen::<f64>();
        debug!(
            domain = ?self.domain,
            tech = %current,
            total_bc = self.total_bc,
            cost,
            chance,
            roll,
            "研究判定"
        );
        (roll < chance).then_some(current)
    }

    /// Marks a tech as known. Returns `false` when it already was.
    pub fn learn_tech(&mut self, id: &TechId, catalog: &TechCatalog) -> bool {
        if self.knows(id) {
            return false;
        }
        self.possible_techs.retain(|tech| tech != id);
        self.bonus_techs.retain(|tech| tech != id);
        self.known_techs.push(id.clone());
        sort_by_level(&mut self.known_techs, catalog);

        if self.current_tech.as_ref() == Some(id) {
            self.total_bc = 0.0;
            self.current_tech = None;
            self.select_new_tech(catalog);
        }
        true
    }

    pub fn ensure_valid_current_tech(&mut self, catalog: &TechCatalog) {
        let Some(current) = self.current_tech.as_ref() else {
            return;
        };
        let reason = match catalog.get(current) {
            None => Some("未知の技術"),
            Some(tech) if tech.domain != self.domain => Some("別分野の技術"),
            Some(_) if self.knows(current) => Some("習得済みの技術"),
            Some(_) => None,
        };
        if let Some(reason) = reason {
            warn!(
                domain = ?self.domain,
                tech = %current,
                "研究対象が不正なため再選択します: {reason}"
            );
            self.current_tech = None;
            self.select_new_tech(catalog);
        }
    }

    /// Picks the cheapest available tech. Marks the domain completed and frees
    /// its allocation when nothing is left.
    pub fn select_new_tech(&mut self, catalog: &TechCatalog) -> Option<TechId> {
        let next = self
            .tech_ids_available_for_research(catalog)
            .into_iter()
            .min_by(|a, b| {
                catalog
                    .level_of(a)
                    .cmp(&catalog.level_of(b))
                    .then_with(|| a.cmp(b))
            });
        match next {
            Some(id) => {
                self.current_tech = Some(id.clone());
                Some(id)
            }
            None => {
                self.current_tech = None;
                self.research_completed = true;
                self.allocation = 0;
                None
            }
        }
    }

    pub fn set_current_tech(&mut self, id: &TechId, catalog: &TechCatalog) -> Result<()> {
        ensure!(
            self.tech_ids_available_for_research(catalog).contains(id),
            "{} は現在研究できる技術ではありません",
            id
        );
        self.current_tech = Some(id.clone());
        Ok(())
    }

    pub fn add_bonus_tech(&mut self, id: &TechId, catalog: &TechCatalog) -> bool {
        let in_domain = catalog
            .get(id)
            .is_some_and(|tech| tech.domain == self.domain);
        if !in_domain || self.knows(id) || self.bonus_techs.contains(id) {
            return false;
        }
        self.bonus_techs.push(id.clone());
        sort_by_level(&mut self.bonus_techs, catalog);
        if self.research_completed {
            self.research_completed = false;
            self.select_new_tech(catalog);
        }
        true
    }

    pub fn max_known_quintile(&self, catalog: &TechCatalog) -> u32 {
        self.known_techs
            .iter()
            .filter_map(|id| catalog.get(id))
            .map(|tech| tech.quintile())
            .max()
            .unwrap_or(0)
    }

    /// Highest band research may reach. One band beyond the known frontier;
    /// at the last non-endgame band the frontier holds until everything at or
    /// below it is researched.
    pub fn max_researchable_quintile(&self, catalog: &TechCatalog) -> u32 {
        let known = self.max_known_quintile(catalog);
        if known < MAX_NON_ENDGAME_BAND {
            return (known + 1).min(QUINTILE_BANDS);
        }
        let pending_below = self
            .possible_techs
            .iter()
            .filter_map(|id| catalog.get(id))
            .any(|tech| tech.quintile() <= known);
        if pending_below {
            known
        } else {
            (known + 1).min(QUINTILE_BANDS)
        }
    }

    pub fn tech_ids_available_for_research(&self, catalog: &TechCatalog) -> Vec<TechId> {
        let horizon = self.max_researchable_quintile(catalog);
        let band_of = |id: &TechId| catalog.get(id).map(|tech| tech.quintile());

        let mut available = self
            .possible_techs
            .iter()
            .filter(|id| band_of(*id).is_some_and(|band| band <= horizon))
            .cloned()
            .collect::<Vec<_>>();

        if available.is_empty() {
            // Empty bands above the frontier would otherwise stall research.
            let lowest_remaining = self.possible_techs.iter().filter_map(band_of).min();
            if let Some(band) = lowest_remaining {
                available.extend(
                    self.possible_techs
                        .iter()
                        .filter(|id| band_of(*id).is_some_and(|b| b <= band))
                        .cloned(),
                );
            }
        }

        for id in &self.bonus_techs {
            if !available.contains(id) && !self.knows(id) {
                available.push(id.clone());
            }
        }
        sort_by_level(&mut available, catalog);
        available
    }
}

/// Rounds a raw research cost up to the granularity of its magnitude.
/// Unbounded costs stay infinite so they can never be discovered.
pub fn round_research_cost(raw: f64) -> f64 {
    if raw.is_nan() || raw == f64::INFINITY {
        return f64::INFINITY;
    }
    if raw <= 0.0 {
        return 0.0;
    }
    let value = raw.ceil();
    let granularity = cost_granularity(value);
    (value / granularity).ceil() * granularity
}

fn cost_granularity(value: f64) -> f64 {
    if value < 100.0 {
        return 10.0;
    }
    if value < 10_000.0 {
        return 100.0;
    }
    let mut granularity = 1_000.0;
    let mut bound = 100_000.0;
    while value >= bound && granularity < MAX_COST_GRANULARITY {
        granularity *= 10.0;
        bound *= 10.0;
    }
    granularity
}

fn sort_by_level(ids: &mut [TechId], catalog: &TechCatalog) {
    ids.sort_by(|a, b| {
        catalog
            .level_of(a)
            .cmp(&catalog.level_of(b))
            .then_with(|| a.cmp(b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn sample_catalog() -> TechCatalog {
        TechCatalog::from_yaml(
            r#"
computer:
  - { id: base, name: Base, level: 1, free: true, effect: { kind: none } }
  - { id: scanner, name: Scanner, level: 3, effect: { kind: scanner_range, amount: 1.0 } }
  - { id: relay, name: Relay, level: 4, effect: { kind: research_bonus, amount: 0.05 } }
  - { id: optics, name: Optics, level: 8, effect: { kind: research_bonus, amount: 0.05 } }
  - { id: archive, name: Archive, level: 9, restricted: true, effect: { kind: research_bonus, amount: 0.2 } }
  - { id: lattice, name: Lattice, level: 22, effect: { kind: research_bonus, amount: 0.05 } }
propulsion:
  - { id: engines, name: Engines, level: 1, free: true, effect: { kind: ship_speed, amount: 1.0 } }
  - { id: star_gate, name: Star Gates, level: 27, effect: { kind: ship_speed, amount: 2.0 } }
  - { id: thorium_cells, name: Thorium Cells, level: 41, effect: { kind: ship_range, amount: 10.0 } }
  - { id: ion_drive, name: Ion Drive, level: 28, effect: { kind: ship_speed, amount: 1.0 } }
"#,
        )
        .unwrap()
    }

    fn category(pct: f64, seed: u64) -> (TechCatalog, TechCategory) {
        let catalog = sample_catalog();
        let mut rng = StdRng::seed_from_u64(seed);
        let category = TechCategory::new(
            TechDomain::Computer,
            &catalog,
            pct,
            TechInclusion::default(),
            &mut rng,
        );
        (catalog, category)
    }

    #[test]
    fn allocation_is_clamped() {
        let (_, mut category) = category(1.0, 1);
        category.set_allocation(90);
        assert_eq!(category.allocation(), 60);
        category.set_allocation(-4);
        assert_eq!(category.allocation(), 0);
    }

    #[test]
    fn full_discovery_lists_every_researchable_tech() {
        let (_, category) = category(1.0, 3);
        let ids = category
            .possible_techs()
            .iter()
            .map(TechId::as_str)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["scanner", "relay", "optics", "lattice"]);
        assert_eq!(category.known_techs(), &[TechId::new("base")]);
        assert_eq!(category.current_tech(), Some(&TechId::new("scanner")));
    }

    #[test]
    fn zero_discovery_forces_one_tech_per_band() {
        for seed in 0..8 {
            let (catalog, category) = category(0.0, seed);
            let bands = category
                .possible_techs()
                .iter()
                .map(|id| catalog.get(id).unwrap().quintile())
                .collect::<Vec<_>>();
            assert_eq!(bands, vec![1, 2, 5]);
        }
    }

    #[test]
    fn propulsion_inclusion_forces_star_gates_and_thorium() {
        let catalog = sample_catalog();
        let mut rng = StdRng::seed_from_u64(5);
        let inclusion = TechInclusion {
            always_star_gates: true,
            always_thorium_cells: true,
        };
        let category =
            TechCategory::new(TechDomain::Propulsion, &catalog, 0.0, inclusion, &mut rng);
        assert!(category.possible_techs().contains(&TechId::new("star_gate")));
        assert!(category.possible_techs().contains(&TechId::new("thorium_cells")));
    }

    #[test]
    fn cost_rounding_follows_magnitude_tiers() {
        assert_eq!(round_research_cost(1_234_567.0), 1_300_000.0);
        assert_eq!(round_research_cost(42.0), 50.0);
        assert_eq!(round_research_cost(4_201.0), 4_300.0);
        assert_eq!(round_research_cost(12_001.0), 13_000.0);
        assert_eq!(round_research_cost(9_999.0), 10_000.0);
        assert_eq!(round_research_cost(5_500_000_001.0), 5_600_000_000.0);
        assert_eq!(round_research_cost(0.0), 0.0);
    }

    #[test]
    fn huge_costs_round_without_overflow() {
        let rounded = round_research_cost(1.9e19);
        assert!(rounded.is_finite());
        assert!(rounded >= 1.9e19);

        let cost = TechCategory::cost_for_tech(100, 1.0e16);
        assert!(cost.is_finite() && cost > 0.0);
    }

    #[test]
    fn unbounded_costs_are_never_discovered() {
        let cost = round_research_cost(f64::INFINITY);
        assert_eq!(cost, f64::INFINITY);
        assert_eq!(round_research_cost(f64::NAN), f64::INFINITY);
        assert_eq!(TechCategory::cost_for_tech(50, f64::INFINITY), f64::INFINITY);
        assert_eq!(TechCategory::discovery_chance(1.0e300, cost), 0.0);
    }

    #[test]
    fn cost_for_level_one_is_rounded_base() {
        // 25 * 1.01 * 1 = 25.25, rounded to the next ten.
        assert_eq!(TechCategory::cost_for_tech(1, 1.0), 30.0);
        assert_eq!(TechCategory::cost_for_tech(10, 1.0), 2_800.0);
    }

    #[test]
    fn discovery_chance_is_zero_until_cost_is_exceeded() {
        assert_eq!(TechCategory::discovery_chance(100.0, 100.0), 0.0);
        assert!((TechCategory::discovery_chance(150.0, 100.0) - 0.25).abs() < 1e-9);
        assert_eq!(TechCategory::discovery_chance(1_000.0, 100.0), 1.0);
    }

    #[test]
    fn current_research_includes_interest() {
        let (_, mut category) = category(1.0, 1);
        category.set_allocation(30);
        // base 60, interest 0.25 * min(20, 60)
        assert!((category.current_research(120.0) - 65.0).abs() < 1e-9);
        category.set_allocation(0);
        assert_eq!(category.current_research(120.0), 0.0);
    }

    #[test]
    fn learn_tech_is_idempotent() {
        let (catalog, mut category) = category(1.0, 9);
        let id = TechId::new("scanner");
        assert!(category.learn_tech(&id, &catalog));
        assert!(!category.learn_tech(&id, &catalog));
        assert_eq!(category.known_techs().iter().filter(|t| **t == id).count(), 1);
        assert!(!category.possible_techs().contains(&id));
        assert_eq!(category.current_tech(), Some(&TechId::new("relay")));
        assert_eq!(category.total_bc(), 0.0);
    }

    #[test]
    fn learning_everything_completes_the_category() {
        let (catalog, mut category) = category(1.0, 2);
        category.set_allocation(20);
        for id in ["scanner", "relay", "optics", "lattice"] {
            category.learn_tech(&TechId::new(id), &catalog);
        }
        assert!(category.is_completed());
        assert_eq!(category.allocation(), 0);
        assert!(category.current_tech().is_none());
    }

    #[test]
    fn horizon_extends_over_empty_bands() {
        let (catalog, mut category) = category(1.0, 4);
        for id in ["scanner", "relay", "optics"] {
            category.learn_tech(&TechId::new(id), &catalog);
        }
        assert_eq!(category.max_researchable_quintile(&catalog), 3);
        assert_eq!(
            category.tech_ids_available_for_research(&catalog),
            vec![TechId::new("lattice")]
        );
    }

    #[test]
    fn last_band_holds_the_frontier_until_lower_bands_are_done() {
        let catalog = TechCatalog::from_yaml(
            r#"
computer:
  - { id: base, name: Base, level: 1, free: true, effect: { kind: none } }
  - { id: mesh, name: Mesh, level: 88, effect: { kind: research_bonus, amount: 0.05 } }
  - { id: oracle, name: Oracle, level: 93, effect: { kind: research_bonus, amount: 0.05 } }
  - { id: singularity, name: Singularity, level: 98, effect: { kind: research_bonus, amount: 0.05 } }
"#,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let mut category = TechCategory::new(
            TechDomain::Computer,
            &catalog,
            1.0,
            TechInclusion::default(),
            &mut rng,
        );
        assert!(category.learn_tech(&TechId::new("oracle"), &catalog));
        assert_eq!(category.max_known_quintile(&catalog), 19);
        assert_eq!(category.max_researchable_quintile(&catalog), 19);
        assert_eq!(
            category.tech_ids_available_for_research(&catalog),
            vec![TechId::new("mesh")]
        );

        assert!(category.learn_tech(&TechId::new("mesh"), &catalog));
        assert_eq!(category.max_researchable_quintile(&catalog), 20);
        assert_eq!(
            category.tech_ids_available_for_research(&catalog),
            vec![TechId::new("singularity")]
        );
    }

    #[test]
    fn bonus_techs_bypass_band_gating() {
        let (catalog, mut category) = category(1.0, 4);
        assert!(category.add_bonus_tech(&TechId::new("archive"), &catalog));
        assert!(!category.add_bonus_tech(&TechId::new("archive"), &catalog));
        assert!(!category.add_bonus_tech(&TechId::new("star_gate"), &catalog));
        let available = category.tech_ids_available_for_research(&catalog);
        assert!(available.contains(&TechId::new("archive")));
        assert!(!available.contains(&TechId::new("lattice")));
    }

    #[test]
    fn set_current_tech_rejects_out_of_horizon() {
        let (catalog, mut category) = category(1.0, 4);
        assert!(category
            .set_current_tech(&TechId::new("lattice"), &catalog)
            .is_err());
        category
            .set_current_tech(&TechId::new("relay"), &catalog)
            .unwrap();
        assert_eq!(category.current_tech(), Some(&TechId::new("relay")));
    }

    #[test]
    fn invalid_current_tech_is_reselected_without_losing_bc() {
        let (catalog, mut category) = category(1.0, 4);
        category.total_bc = 120.0;
        category.current_tech = Some(TechId::new("star_gate"));
        category.ensure_valid_current_tech(&catalog);
        assert_eq!(category.current_tech(), Some(&TechId::new("scanner")));
        assert_eq!(category.total_bc(), 120.0);
    }

    #[test]
    fn allocation_accumulates_and_eventually_discovers() {
        let (catalog, mut category) = category(1.0, 4);
        category.set_allocation(60);
        let mut rng = StdRng::seed_from_u64(11);
        let mut learned = None;
        for _ in 0..50 {
            if let Some(id) = category.allocate_research_bc(40.0, &catalog, 1.0, &mut rng) {
                learned = Some(id);
                break;
            }
        }
        assert_eq!(learned, Some(TechId::new("scanner")));
        assert!(category.research_started());
    }
}
