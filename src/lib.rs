// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # coopcycle-ld
//!
//! Scrapes the CoopCycle federation of delivery cooperatives into schema.org
//! JSON-LD, converts it to RDF and queries it through a SPARQL triple store.
//!
//! ## Architecture
//!
//! - **Scraping** (`scrape`): service catalog, HTML extraction, JSON-LD
//!   normalization and the `service` / `restaurant` / `offer` phases
//! - **Document store** (`docstore`): keyed JSON-LD documents on disk or in memory
//! - **RDF** (`rdf`): JSON-LD → Turtle conversion and SHACL validation via `oxigraph`
//! - **Triple store** (`triplestore`): SPARQL 1.1 Protocol client and an embedded store
//! - **Queries** (`sparql`): the named query catalog with bound parameters
//! - **Preferences** (`preferences`): interactive user preference graph
//!
//! ## Library usage
//!
//! ```no_run
//! use coopcycle_ld::sparql::QueryCatalog;
//! use coopcycle_ld::triplestore::{EmbeddedTripleStore, TripleStore};
//!
//! let store = EmbeddedTripleStore::in_memory().unwrap();
//! store
//!     .upload(
//!         "<https://lyon.coopcycle.org/api/restaurants/1> a <http://schema.org/Restaurant> ; \
//!          <http://schema.org/name> \"Chez Paul\" .",
//!         None,
//!     )
//!     .unwrap();
//! for record in QueryCatalog::new(&store).restaurants_by_name("paul").unwrap() {
//!     println!("{}", record.name);
//! }
//! ```

pub mod config;
pub mod docstore;
pub mod error;
pub mod fetch;
pub mod paths;
pub mod preferences;
pub mod rdf;
pub mod scrape;
pub mod sparql;
pub mod triplestore;
