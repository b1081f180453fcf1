mod catalog;
mod category;
mod empire_tech;

pub use catalog::{Tech, TechCatalog, TechDomain, TechEffect};
pub use category::{TechCategory, round_research_cost};
pub use empire_tech::EmpireTech;
