//! Scrape phases: `service`, `restaurant` and `offer`.
//!
//! Each restaurant page is one unit of work. A unit that fails is logged and
//! counted; it never stops the rest of the phase and never touches another
//! unit's output. With `jobs > 1` units run on a dedicated rayon pool.

use rayon::prelude::*;
use serde_json::Value;

use crate::config::ScrapeConfig;
use crate::docstore::{DocumentKey, DocumentStore};
use crate::error::ScrapeError;
use crate::fetch::Fetch;
use crate::scrape::catalog::{ServiceCatalog, ServiceRef, service_slug};
use crate::scrape::extract::{self, RestaurantListing};
use crate::scrape::normalize::{
    RestaurantIdRewriter, offer_document, restaurant_document, service_document,
};

pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

/// Per-phase counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PhaseSummary {
    fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Written => self.written += 1,
            UnitOutcome::Skipped => self.skipped += 1,
            UnitOutcome::Failed => self.failed += 1,
        }
    }

    fn merge(&mut self, other: PhaseSummary) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl std::fmt::Display for PhaseSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} written, {} skipped, {} failed",
            self.written, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    Written,
    /// Nothing to write: no JSON-LD, no menu, no service URL.
    Skipped,
    Failed,
}

/// Which per-restaurant document a phase produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestaurantPhase {
    Restaurant,
    Offer,
}

/// Drives the scrape phases against a fetcher and a document store.
pub struct Scraper<'a> {
    fetch: &'a dyn Fetch,
    store: &'a dyn DocumentStore,
    config: &'a ScrapeConfig,
    rewriter: RestaurantIdRewriter,
    pool: Option<rayon::ThreadPool>,
}

impl<'a> Scraper<'a> {
    pub fn new(
        fetch: &'a dyn Fetch,
        store: &'a dyn DocumentStore,
        config: &'a ScrapeConfig,
    ) -> ScrapeResult<Self> {
        let rewriter = RestaurantIdRewriter::new(&config.federation_domain)?;
        let pool = if config.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.jobs)
                .thread_name(|i| format!("scrape-{i}"))
                .build()
                .map_err(|e| ScrapeError::Pool {
                    message: e.to_string(),
                })?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            fetch,
            store,
            config,
            rewriter,
            pool,
        })
    }

    /// Download the catalog feed, store it raw, and write one `Service`
    /// document per entry whose service site can be detected.
    pub fn scrape_services(&self) -> ScrapeResult<PhaseSummary> {
        let raw = self.fetch.get_text(&self.config.catalog_url)?;
        let feed: Value = serde_json::from_str(&raw).map_err(|e| ScrapeError::Catalog {
            message: e.to_string(),
        })?;
        let catalog = ServiceCatalog::from_value(&feed)?;
        self.store.put(&DocumentKey::Catalog, &feed)?;
        tracing::info!(entries = catalog.len(), "catalog stored");

        let domain = &self.config.federation_domain;
        let mut summary = PhaseSummary::default();
        summary.skipped += catalog.len() - catalog.entries().count();

        for (index, entry) in catalog.entries() {
            let Some(service_url) = entry.service_url(domain) else {
                tracing::warn!(index, name = ?entry.name, "no service URL in catalog entry");
                summary.record(UnitOutcome::Skipped);
                continue;
            };
            let key = DocumentKey::Service {
                index,
                service: service_slug(&service_url, domain),
            };
            let document = serde_json::to_value([service_document(entry, &service_url)])
                .map_err(|e| ScrapeError::Encode {
                    what: "service document",
                    message: e.to_string(),
                })?;
            match self.store.put(&key, &document) {
                Ok(()) => {
                    tracing::info!(index, service = %service_url, %key, "service written");
                    summary.record(UnitOutcome::Written);
                }
                Err(e) => {
                    tracing::warn!(index, service = %service_url, error = %e, "service not written");
                    summary.record(UnitOutcome::Failed);
                }
            }
        }
        Ok(summary)
    }

    /// The catalog stored by a previous `service` phase.
    pub fn load_catalog(&self) -> ScrapeResult<ServiceCatalog> {
        let feed = self
            .store
            .get(&DocumentKey::Catalog)?
            .ok_or(ScrapeError::MissingCatalog)?;
        ServiceCatalog::from_value(&feed)
    }

    /// Write the fixed-up embedded JSON-LD of every listed restaurant.
    pub fn scrape_restaurants(&self) -> ScrapeResult<PhaseSummary> {
        self.run_restaurant_phase(RestaurantPhase::Restaurant)
    }

    /// Write the menu/offer document of every listed restaurant.
    pub fn scrape_offers(&self) -> ScrapeResult<PhaseSummary> {
        self.run_restaurant_phase(RestaurantPhase::Offer)
    }

    fn run_restaurant_phase(&self, phase: RestaurantPhase) -> ScrapeResult<PhaseSummary> {
        let catalog = self.load_catalog()?;
        let mut summary = PhaseSummary::default();

        for service in catalog.services(&self.config.federation_domain) {
            let listings = match self.listings(&service) {
                Ok(listings) => listings,
                Err(e) => {
                    tracing::warn!(
                        index = service.index,
                        service = %service.base_url,
                        error = %e,
                        "shop listing unavailable"
                    );
                    summary.record(UnitOutcome::Failed);
                    continue;
                }
            };
            if listings.is_empty() {
                tracing::warn!(
                    index = service.index,
                    service = %service.base_url,
                    "cannot find shops-list"
                );
                continue;
            }
            summary.merge(self.run_units(&service, &listings, phase));
        }
        Ok(summary)
    }

    fn listings(&self, service: &ServiceRef) -> ScrapeResult<Vec<RestaurantListing>> {
        let url = format!("{}{}", service.base_url, self.config.shops_path);
        let html = self.fetch.get_text(&url)?;
        Ok(extract::restaurant_listings(
            &html,
            &self.config.restaurant_prefix,
        ))
    }

    fn run_units(
        &self,
        service: &ServiceRef,
        listings: &[RestaurantListing],
        phase: RestaurantPhase,
    ) -> PhaseSummary {
        let unit = |listing: &RestaurantListing| {
            let page_url = format!("{}{}", service.base_url, listing.path);
            let result = match phase {
                RestaurantPhase::Restaurant => self.restaurant_unit(service, listing, &page_url),
                RestaurantPhase::Offer => self.offer_unit(service, listing, &page_url),
            };
            result.unwrap_or_else(|e| {
                tracing::warn!(
                    index = service.index,
                    restaurant = %listing.id,
                    page = %page_url,
                    error = %e,
                    "restaurant failed"
                );
                UnitOutcome::Failed
            })
        };

        let outcomes: Vec<UnitOutcome> = match &self.pool {
            Some(pool) => pool.install(|| listings.par_iter().map(unit).collect()),
            None => listings.iter().map(unit).collect(),
        };

        let mut summary = PhaseSummary::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }

    fn restaurant_unit(
        &self,
        service: &ServiceRef,
        listing: &RestaurantListing,
        page_url: &str,
    ) -> ScrapeResult<UnitOutcome> {
        let html = self.fetch.get_text(page_url)?;
        let embedded = extract::embedded_jsonld(&html);
        if embedded.is_empty() {
            tracing::warn!(index = service.index, page = %page_url, "cannot find JSON-LD");
            return Ok(UnitOutcome::Skipped);
        }

        let document = restaurant_document(embedded, &service.base_url, page_url, &self.rewriter);
        let key = DocumentKey::Restaurant {
            index: service.index,
            service: service.slug.clone(),
            restaurant: listing.file_stem(),
        };
        self.store.put(&key, &Value::Array(document))?;
        tracing::info!(index = service.index, page = %page_url, %key, "restaurant written");
        Ok(UnitOutcome::Written)
    }

    fn offer_unit(
        &self,
        service: &ServiceRef,
        listing: &RestaurantListing,
        page_url: &str,
    ) -> ScrapeResult<UnitOutcome> {
        let html = self.fetch.get_text(page_url)?;
        let Some(menu) = extract::menu(&html) else {
            tracing::info!(index = service.index, page = %page_url, "no menu");
            return Ok(UnitOutcome::Skipped);
        };

        let document = offer_document(&menu, page_url, &self.rewriter);
        let value = serde_json::to_value(&document).map_err(|e| ScrapeError::Encode {
            what: "offer document",
            message: e.to_string(),
        })?;
        let key = DocumentKey::Offer {
            index: service.index,
            service: service.slug.clone(),
            restaurant: listing.file_stem(),
        };
        self.store.put(&key, &value)?;
        tracing::info!(
            index = service.index,
            page = %page_url,
            sections = menu.sections.len(),
            %key,
            "offer written"
        );
        Ok(UnitOutcome::Written)
    }
}
