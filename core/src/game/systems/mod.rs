pub(crate) mod diplomacy;
pub mod espionage;
pub(crate) mod facade;
pub mod intelligence;
pub(crate) mod research;
pub(crate) mod tasks;
