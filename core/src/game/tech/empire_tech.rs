use anyhow::{Result, anyhow, ensure};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::catalog::{TechCatalog, TechDomain};
use super::category::TechCategory;
use crate::game::{MAX_ALLOCATION_TICKS, TECH_CATEGORY_COUNT, TechId, TechInclusion};

/// The six research categories of one empire. Allocations across the
/// unfinished categories always sum to the full tick budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpireTech {
    categories: Vec<TechCategory>,
}

impl EmpireTech {
    pub fn new(
        catalog: &TechCatalog,
        discovery_pct: f64,
        inclusion: TechInclusion,
        rng: &mut StdRng,
    ) -> Self {
        let even_share = MAX_ALLOCATION_TICKS / TECH_CATEGORY_COUNT as i32;
        let categories = TechDomain::ALL
            .into_iter()
            .map(|domain| {
                let mut category =
                    TechCategory::new(domain, catalog, discovery_pct, inclusion, rng);
                if !category.is_completed() {
                    category.set_allocation(even_share);
                }
                category
            })
            .collect();
        let mut tech = Self { categories };
        tech.restore_full_budget();
        tech
    }

    pub fn category(&self, domain: TechDomain) -> &TechCategory {
        &self.categories[domain.index()]
    }

    pub fn category_mut(&mut self, domain: TechDomain) -> &mut TechCategory {
        &mut self.categories[domain.index()]
    }

    pub fn categories(&self) -> &[TechCategory] {
        &self.categories
    }

    pub fn knows(&self, id: &TechId) -> bool {
        self.categories.iter().any(|category| category.knows(id))
    }

    pub fn known_count(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.known_techs().len())
            .sum()
    }

    pub fn total_allocation(&self) -> i32 {
        self.categories.iter().map(TechCategory::allocation).sum()
    }

    /// Learns a tech in its own category. Ticks freed by a category running
    /// out of research are handed to the remaining ones.
    pub fn learn_tech(&mut self, catalog: &TechCatalog, id: &TechId) -> bool {
        let Some(tech) = catalog.get(id) else {
            warn!(tech = %id, "未知の技術を習得しようとしました");
            return false;
        };
        let learned = self.categories[tech.domain.index()].learn_tech(id, catalog);
        if learned {
            self.restore_full_budget();
        }
        learned
    }

    /// Spends this turn's research in every category and returns the
    /// breakthroughs. A category that runs dry while picking its next target
    /// releases its ticks to the others before this returns.
    pub fn allocate_research(
        &mut self,
        total_rp: f64,
        catalog: &TechCatalog,
        cost_modifier: f64,
        rng: &mut StdRng,
    ) -> Vec<TechId> {
        let discoveries = self
            .categories
            .iter_mut()
            .filter_map(|category| {
                category.allocate_research_bc(total_rp, catalog, cost_modifier, rng)
            })
            .collect();
        self.restore_full_budget();
        discoveries
    }

    pub fn redistribute_allocation(&mut self, freed: i32) {
        let open = self.open_indices(None);
        if open.is_empty() || freed <= 0 {
            return;
        }
        let share = freed / open.len() as i32;
        let mut remainder = freed % open.len() as i32;
        for idx in open {
            let category = &mut self.categories[idx];
            let mut extra = share;
            if remainder > 0 {
                extra += 1;
                remainder -= 1;
            }
            category.set_allocation(category.allocation() + extra);
        }
    }

    /// Sets one category's ticks and rebalances the other open categories one
    /// tick at a time so the total is unchanged.
    pub fn adjust_allocation(&mut self, domain: TechDomain, ticks: i32) -> Result<i32> {
        let target = domain.index();
        ensure!(
            !self.categories[target].is_completed(),
            "{} の研究はすでに完了しています",
            domain
        );
        ensure!(
            !self.categories[target].is_locked(),
            "{} の配分はロックされています",
            domain
        );
        let desired = ticks.clamp(0, MAX_ALLOCATION_TICKS);
        let others = self.open_indices(Some(target));

        let mut delta = desired - self.categories[target].allocation();
        while delta > 0 {
            let donor = others
                .iter()
                .copied()
                .filter(|idx| self.categories[*idx].allocation() > 0)
                .max_by(|a, b| {
                    self.categories[*a]
                        .allocation()
                        .cmp(&self.categories[*b].allocation())
                        .then_with(|| b.cmp(a))
                });
            let Some(donor) = donor else {
                break;
            };
            self.shift_tick(donor, target);
            delta -= 1;
        }
        while delta < 0 {
            let receiver = others
                .iter()
                .copied()
                .filter(|idx| self.categories[*idx].allocation() < MAX_ALLOCATION_TICKS)
                .min_by(|a, b| {
                    self.categories[*a]
                        .allocation()
                        .cmp(&self.categories[*b].allocation())
                        .then_with(|| a.cmp(b))
                });
            let Some(receiver) = receiver else {
                break;
            };
            self.shift_tick(target, receiver);
            delta += 1;
        }
        Ok(self.categories[target].allocation())
    }

    pub fn set_locked(&mut self, domain: TechDomain, locked: bool) {
        self.category_mut(domain).set_locked(locked);
    }

    pub fn set_research_target(
        &mut self,
        catalog: &TechCatalog,
        domain: TechDomain,
        id: &TechId,
    ) -> Result<()> {
        let tech = catalog.require(id)?;
        if tech.domain != domain {
            return Err(anyhow!("{} は {} の技術ではありません", id, domain));
        }
        self.category_mut(domain).set_current_tech(id, catalog)
    }

    fn restore_full_budget(&mut self) {
        let deficit = MAX_ALLOCATION_TICKS - self.total_allocation();
        if deficit > 0 {
            self.redistribute_allocation(deficit);
        }
    }

    fn shift_tick(&mut self, from: usize, to: usize) {
        let source = &mut self.categories[from];
        source.set_allocation(source.allocation() - 1);
        let dest = &mut self.categories[to];
        dest.set_allocation(dest.allocation() + 1);
    }

    fn open_indices(&self, exclude: Option<usize>) -> Vec<usize> {
        self.categories
            .iter()
            .enumerate()
            .filter(|(idx, category)| {
                Some(*idx) != exclude && !category.is_locked() && !category.is_completed()
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn sample_tech() -> (TechCatalog, EmpireTech) {
        let catalog = TechCatalog::from_embedded().unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let tech = EmpireTech::new(&catalog, 1.0, TechInclusion::default(), &mut rng);
        (catalog, tech)
    }

    #[test]
    fn starts_with_even_allocation() {
        let (_, tech) = sample_tech();
        assert!(tech.categories().iter().all(|c| c.allocation() == 10));
        assert_eq!(tech.total_allocation(), MAX_ALLOCATION_TICKS);
    }

    #[test]
    fn adjusting_one_category_keeps_the_total() {
        let (_, mut tech) = sample_tech();
        let applied = tech.adjust_allocation(TechDomain::Weapon, 30).unwrap();
        assert_eq!(applied, 30);
        assert_eq!(tech.total_allocation(), MAX_ALLOCATION_TICKS);
        assert_eq!(tech.category(TechDomain::Computer).allocation(), 6);

        tech.adjust_allocation(TechDomain::Weapon, 0).unwrap();
        assert_eq!(tech.total_allocation(), MAX_ALLOCATION_TICKS);
        assert_eq!(tech.category(TechDomain::Weapon).allocation(), 0);
    }

    #[test]
    fn locked_categories_are_left_alone() {
        let (_, mut tech) = sample_tech();
        tech.set_locked(TechDomain::Computer, true);
        tech.adjust_allocation(TechDomain::Weapon, 60).unwrap();
        assert_eq!(tech.category(TechDomain::Computer).allocation(), 10);
        assert_eq!(tech.category(TechDomain::Weapon).allocation(), 50);
        assert!(tech.adjust_allocation(TechDomain::Computer, 20).is_err());
    }

    #[test]
    fn completing_a_category_frees_its_ticks() {
        let (catalog, mut tech) = sample_tech();
        let remaining = tech
            .category(TechDomain::Computer)
            .possible_techs()
            .to_vec();
        for id in &remaining {
            assert!(tech.learn_tech(&catalog, id));
        }
        let computer = tech.category(TechDomain::Computer);
        assert!(computer.is_completed());
        assert_eq!(computer.allocation(), 0);
        assert_eq!(tech.total_allocation(), MAX_ALLOCATION_TICKS);
        assert_eq!(tech.category(TechDomain::Weapon).allocation(), 12);
    }

    #[test]
    fn ticks_freed_while_selecting_a_target_are_redistributed() {
        let (catalog, mut tech) = sample_tech();
        let computer = tech.category_mut(TechDomain::Computer);
        for id in computer.possible_techs().to_vec() {
            computer.learn_tech(&id, &catalog);
        }
        assert!(computer.is_completed());
        assert_eq!(tech.total_allocation(), MAX_ALLOCATION_TICKS - 10);

        let mut rng = StdRng::seed_from_u64(4);
        let discoveries = tech.allocate_research(0.0, &catalog, 1.0, &mut rng);
        assert!(discoveries.is_empty());
        assert_eq!(tech.category(TechDomain::Computer).allocation(), 0);
        assert_eq!(tech.total_allocation(), MAX_ALLOCATION_TICKS);
        assert_eq!(tech.category(TechDomain::Weapon).allocation(), 12);
    }

    #[test]
    fn research_target_must_match_domain() {
        let (catalog, mut tech) = sample_tech();
        let result = tech.set_research_target(
            &catalog,
            TechDomain::Computer,
            &TechId::new("star_gate"),
        );
        assert!(result.is_err());
        assert!(tech.knows(&TechId::new("laser")));
    }
}
