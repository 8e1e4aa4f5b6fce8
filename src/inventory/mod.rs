//! Inventory Pipeline (C4, spec §4.4): scraping, image mirroring, smart
//! merge, bulk import/sync, and the daily scrape scheduler.

pub mod bulk;
pub mod images;
pub mod merge;
pub mod provider_chain;
pub mod providers;
pub mod scheduler;
pub mod scrape;
