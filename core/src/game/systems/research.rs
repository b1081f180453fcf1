use rand::rngs::StdRng;

use crate::game::empire::EmpireState;
use crate::game::galaxy::Galaxy;
use crate::game::tech::TechCatalog;

/// Spends every active empire's research for the turn and applies the
/// breakthroughs.
pub(crate) fn allocate_all(
    empires: &mut [EmpireState],
    galaxy: &Galaxy,
    catalog: &TechCatalog,
    rng: &mut StdRng,
) -> Vec<String> {
    let mut reports = Vec::new();
    for empire in empires.iter_mut().filter(|empire| empire.is_active()) {
        let total_rp = empire.total_research_points(galaxy);
        let cost_modifier = empire.modifiers.research_cost;
        let discoveries = empire
            .tech
            .allocate_research(total_rp, catalog, cost_modifier, rng);

        for id in discoveries {
            if !empire.learn_tech(catalog, &id) {
                continue;
            }
            let name = catalog.get(&id).map_or(id.as_str(), |tech| tech.name.as_str());
            reports.push(format!("{} が {} を開発しました。", empire.name, name));
        }
    }
    reports
}
