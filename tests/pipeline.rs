//! End-to-end tests: scrape canned pages, convert to Turtle, load an embedded
//! store and run the named queries against it.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use coopcycle_ld::config::{PreferencesConfig, ScrapeConfig};
use coopcycle_ld::docstore::FsDocumentStore;
use coopcycle_ld::error::FetchError;
use coopcycle_ld::fetch::{Fetch, FetchResult};
use coopcycle_ld::preferences::{UserPreferences, publish};
use coopcycle_ld::rdf::convert_tree;
use coopcycle_ld::scrape::Scraper;
use coopcycle_ld::sparql::{DEFAULT_MAX_DISTANCE, DeliveryServiceRecord, QueryCatalog};
use coopcycle_ld::triplestore::{EmbeddedTripleStore, TripleStore};

struct CannedFetch {
    pages: HashMap<&'static str, &'static str>,
}

impl Fetch for CannedFetch {
    fn get_text(&self, url: &str) -> FetchResult<String> {
        self.pages
            .get(url)
            .map(|body| body.to_string())
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
                body: String::new(),
            })
    }
}

const CATALOG: &str = r#"[
    {"name": "Les Coursiers Lyonnais", "city": "Lyon", "country": "fr",
     "latitude": 45.76, "longitude": 4.83,
     "coopcycle_url": "https://lyon.coopcycle.org",
     "text": {"fr": "Livraison a velo", "en": "Bike delivery"}}
]"#;

const SHOPS: &str = r#"<html><body><div id="shops-list">
    <a href="/en/restaurant/42-chez-paul">Chez Paul</a>
    <a href="/en/restaurant/42-chez-paul">Chez Paul (again)</a>
</div></body></html>"#;

const CHEZ_PAUL: &str = r#"<html><head>
<script type="application/ld+json">
{"@context": "http://schema.org", "@type": "Restaurant",
 "@id": "/api/restaurants/42", "name": "Chez Paul",
 "description": "Bouchon lyonnais",
 "address": {"@type": "PostalAddress", "streetAddress": "1 rue Merciere, Lyon",
             "telephone": "+33 4 00 00 00 00",
             "geo": {"@type": "GeoCoordinates", "latitude": 45.75, "longitude": 4.85}}}
</script></head><body>
<div id="menu">
  <h2>Entrees</h2>
  <div class="restaurant-menu-section">
    <div class="restaurant-menu-section-item">
      <h5 class="menu-item-name">Soupe</h5>
      <span class="menu-item-price">6,50 €</span>
    </div>
  </div>
  <h2>Plats</h2>
  <div class="restaurant-menu-section">
    <div class="restaurant-menu-section-item">
      <h5 class="menu-item-name">Quenelle</h5>
      <small class="menu-item-description">Sauce Nantua</small>
      <span class="menu-item-price">9,50 €</span>
    </div>
    <div class="restaurant-menu-section-item">
      <h5 class="menu-item-name">Tablier de sapeur</h5>
      <span class="menu-item-price">16,00 €</span>
    </div>
  </div>
</div></body></html>"#;

fn fetcher() -> CannedFetch {
    CannedFetch {
        pages: HashMap::from([
            ("https://coopcycle.org/coopcycle.json", CATALOG),
            ("https://lyon.coopcycle.org/en/shops", SHOPS),
            ("https://lyon.coopcycle.org/en/restaurant/42-chez-paul", CHEZ_PAUL),
        ]),
    }
}

fn scrape_into(data_dir: &Path) {
    let fetch = fetcher();
    let documents = FsDocumentStore::new(data_dir);
    let config = ScrapeConfig::default();
    let scraper = Scraper::new(&fetch, &documents, &config).unwrap();

    assert_eq!(scraper.scrape_services().unwrap().written, 1);
    assert_eq!(scraper.scrape_restaurants().unwrap().written, 1);
    assert_eq!(scraper.scrape_offers().unwrap().written, 1);
}

fn loaded_store(data_dir: &Path) -> EmbeddedTripleStore {
    let report = convert_tree(&data_dir.join("jsonld")).unwrap();
    assert!(report.failed.is_empty(), "failed: {:?}", report.failed);
    assert_eq!(report.converted.len(), 3);
    assert_eq!(report.output_root, data_dir.join("ttl"));

    let store = EmbeddedTripleStore::in_memory().unwrap();
    for (_, ttl) in &report.converted {
        let turtle = std::fs::read_to_string(ttl).unwrap();
        store.upload(&turtle, None).unwrap();
    }
    store
}

#[test]
fn scrape_convert_and_query() {
    let dir = tempfile::TempDir::new().unwrap();
    let data = dir.path().join("data");
    scrape_into(&data);
    assert!(data.join("coopcycle.json").is_file());
    assert!(
        data.join("jsonld/restaurant/0-lyon/42-chez-paul.json")
            .is_file()
    );

    let store = loaded_store(&data);
    let catalog = QueryCatalog::new(&store);

    let restaurants = catalog.restaurants_by_name("chez").unwrap();
    assert_eq!(restaurants.len(), 1);
    assert_eq!(restaurants[0].name, "Chez Paul");
    assert_eq!(restaurants[0].description, "Bouchon lyonnais");
    assert_eq!(restaurants[0].address, "1 rue Merciere");

    let cheap: Vec<_> = catalog
        .price_range(10.0)
        .unwrap()
        .into_iter()
        .map(|r| r.menu_item)
        .collect();
    assert_eq!(cheap, vec!["Soupe", "Quenelle"]);

    let services = catalog.delivery_services().unwrap();
    assert_eq!(
        services,
        vec![DeliveryServiceRecord {
            name: "Les Coursiers Lyonnais".into(),
            country: "fr".into(),
            locality: "Lyon".into(),
        }]
    );

    let nearby = catalog.in_area(45.76, 4.83, 0.05, 0.05).unwrap();
    assert_eq!(nearby.len(), 1);
    assert_eq!(
        nearby[0].restaurant,
        "https://lyon.coopcycle.org/api/restaurants/42"
    );
}

#[test]
fn collected_preferences_find_nearby_restaurant() {
    let dir = tempfile::TempDir::new().unwrap();
    let data = dir.path().join("data");
    scrape_into(&data);
    let store = loaded_store(&data);

    let answers = "Alice\n69002\nLyon\n12\n4.83\n45.76\n";
    let preferences =
        UserPreferences::prompt(&mut Cursor::new(answers), &mut Vec::new()).unwrap();
    let config = PreferencesConfig {
        output_file: dir.path().join("user_preferences.ttl"),
        ..PreferencesConfig::default()
    };
    let published = publish(&preferences, &config, &store).unwrap();

    let matches = QueryCatalog::new(&store)
        .combined_prefs(&published.person, DEFAULT_MAX_DISTANCE)
        .unwrap();
    assert!(!matches.is_empty());
    assert!(matches.iter().all(|m| m.name == "Chez Paul"));
    assert!(matches.iter().all(|m| m.day == "Unknown"));
}

#[test]
fn rescrape_rewrites_identical_turtle() {
    let dir = tempfile::TempDir::new().unwrap();
    let data = dir.path().join("data");
    scrape_into(&data);
    convert_tree(&data.join("jsonld")).unwrap();
    let offer = data.join("ttl/offer/0-lyon/42-chez-paul.ttl");
    let first = std::fs::read(&offer).unwrap();

    scrape_into(&data);
    convert_tree(&data.join("jsonld")).unwrap();
    assert_eq!(std::fs::read(&offer).unwrap(), first);
}

#[test]
fn deleting_a_graph_empties_it() {
    let dir = tempfile::TempDir::new().unwrap();
    let data = dir.path().join("data");
    scrape_into(&data);
    let report = convert_tree(&data.join("jsonld")).unwrap();

    let store = EmbeddedTripleStore::in_memory().unwrap();
    let graph = "http://localhost/graphs/restaurants";
    for (_, ttl) in &report.converted {
        store
            .upload(&std::fs::read_to_string(ttl).unwrap(), Some(graph))
            .unwrap();
    }
    let in_graph = format!("SELECT ?s WHERE {{ GRAPH <{graph}> {{ ?s ?p ?o }} }}");
    assert!(!store.query(&in_graph).unwrap().is_empty());

    store.delete(Some(graph)).unwrap();
    assert!(store.query(&in_graph).unwrap().is_empty());
}
