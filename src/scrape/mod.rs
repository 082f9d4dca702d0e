//! Scrape phase: catalog feed and federation web pages to JSON-LD documents.

pub mod catalog;
pub mod extract;
pub mod normalize;
pub mod pipeline;

pub use catalog::{ServiceCatalog, ServiceCatalogEntry, ServiceRef};
pub use pipeline::{PhaseSummary, Scraper};
