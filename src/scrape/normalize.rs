//! JSON-LD document assembly.
//!
//! Turns catalog entries, embedded restaurant JSON-LD and extracted menus into
//! schema.org documents whose identifiers are absolute and stable across
//! re-scrapes of unchanged pages.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ScrapeError;
use crate::scrape::catalog::ServiceCatalogEntry;
use crate::scrape::extract::{ExtractedItem, ExtractedMenu, ExtractedSection};

/// Context written into every document.
pub const SCHEMA_CONTEXT: &str = "http://schema.org";

/// `{"@id": ...}` node reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    #[serde(rename = "@id")]
    pub id: String,
}

impl IdRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

// ---------------------------------------------------------------------------
// Service documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalAddress {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "addressLocality")]
    pub locality: Option<String>,
    #[serde(rename = "addressCountry")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinates {
    #[serde(rename = "@type")]
    pub kind: String,
    pub latitude: Value,
    pub longitude: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(rename = "@type")]
    pub kind: String,
    pub address: PostalAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoCoordinates>,
}

/// Language-tagged string value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LangString {
    #[serde(rename = "@value")]
    pub value: String,
    #[serde(rename = "@language")]
    pub language: String,
}

/// A federation member as a schema.org `Service`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDocument {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: Option<String>,
    pub provider: Organization,
    #[serde(rename = "serviceType")]
    pub service_type: String,
    #[serde(rename = "areaServed")]
    pub area_served: Place,
    #[serde(rename = "sameAs")]
    pub same_as: Vec<String>,
    pub url: String,
    pub description: Vec<LangString>,
}

/// Build the `Service` document for one catalog entry hosted at `service_url`.
pub fn service_document(entry: &ServiceCatalogEntry, service_url: &str) -> ServiceDocument {
    let same_as = [&entry.facebook_url, &entry.twitter_url, &entry.instagram_url]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

    let description = entry
        .text
        .iter()
        .flatten()
        .map(|(language, value)| LangString {
            value: value.clone(),
            language: language.clone(),
        })
        .collect();

    let geo = entry.coordinates().map(|(lat, long)| GeoCoordinates {
        kind: "GeoCoordinates".into(),
        latitude: lat.clone(),
        longitude: long.clone(),
    });

    ServiceDocument {
        context: format!("{SCHEMA_CONTEXT}/"),
        id: service_url.to_string(),
        kind: "Service".into(),
        name: entry.name.clone(),
        provider: Organization {
            kind: "Organization".into(),
            name: "CoopCycle".into(),
        },
        service_type: "DeliveryService".into(),
        area_served: Place {
            kind: "Place".into(),
            address: PostalAddress {
                kind: "PostalAddress".into(),
                locality: entry.city.clone(),
                country: entry.country.clone(),
            },
            geo,
        },
        same_as,
        url: service_url.to_string(),
        description,
    }
}

// ---------------------------------------------------------------------------
// Restaurant identifiers
// ---------------------------------------------------------------------------

/// Rewrites restaurant page URLs to the canonical API identifier.
#[derive(Debug, Clone)]
pub struct RestaurantIdRewriter {
    pattern: Regex,
}

impl RestaurantIdRewriter {
    pub fn new(federation_domain: &str) -> Result<Self, ScrapeError> {
        let source = format!(
            r"^https?://([^/]+?\.{})/.*?/(\d+)(?:-[^/]+)?/?$",
            regex::escape(federation_domain)
        );
        let pattern = Regex::new(&source).map_err(|e| ScrapeError::Pattern {
            domain: federation_domain.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    /// `https://{host}/api/restaurants/{id}` when the page URL matches.
    pub fn try_canonical(&self, page_url: &str) -> Option<String> {
        let caps = self.pattern.captures(page_url)?;
        Some(format!("https://{}/api/restaurants/{}", &caps[1], &caps[2]))
    }

    /// Canonical identifier, or the page URL itself when the pattern misses.
    pub fn canonical(&self, page_url: &str) -> String {
        self.try_canonical(page_url).unwrap_or_else(|| {
            tracing::debug!(page_url, "restaurant id pattern mismatch, keeping page URL");
            page_url.to_string()
        })
    }
}

// ---------------------------------------------------------------------------
// Restaurant documents
// ---------------------------------------------------------------------------

/// Fix up the JSON-LD objects embedded in a restaurant page.
///
/// Every relative `@id` becomes absolute against `service_url`; each object is
/// linked to its listing page through `url` and `sameAs`; a trailing service
/// stub records `areaServed` from the service to the page.
pub fn restaurant_document(
    embedded: Vec<Value>,
    service_url: &str,
    page_url: &str,
    rewriter: &RestaurantIdRewriter,
) -> Vec<Value> {
    let mut objects: Vec<Value> = embedded
        .into_iter()
        .flat_map(|block| match block {
            Value::Array(items) => items,
            other => vec![other],
        })
        .collect();

    for object in &mut objects {
        absolutize_ids(object, service_url);
        let Value::Object(map) = object else {
            continue;
        };
        let id = match map.get("@id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = rewriter.canonical(page_url);
                map.insert("@id".into(), Value::String(id.clone()));
                id
            }
        };
        map.insert(
            "sameAs".into(),
            json!({ "@id": page_url, "sameAs": { "@id": id } }),
        );
        map.insert("url".into(), Value::String(page_url.to_string()));
    }

    objects.push(json!({
        "@context": SCHEMA_CONTEXT,
        "@id": service_url,
        "areaServed": { "@id": page_url },
    }));
    objects
}

/// Resolve every root-relative `@id` against `base`.
///
/// Protocol-relative ids (`//host/path`) take the scheme of `base`.
fn absolutize_ids(value: &mut Value, base: &str) {
    match value {
        Value::Object(map) => {
            absolutize_map(map, base);
        }
        Value::Array(items) => {
            for item in items {
                absolutize_ids(item, base);
            }
        }
        _ => {}
    }
}

fn absolutize_map(map: &mut Map<String, Value>, base: &str) {
    for (key, value) in map.iter_mut() {
        match value {
            Value::String(id) if key == "@id" && id.starts_with("//") => {
                let scheme = base.split_once("://").map_or("https", |(scheme, _)| scheme);
                *id = format!("{scheme}:{id}");
            }
            Value::String(id) if key == "@id" && id.starts_with('/') => {
                *id = format!("{}{}", base.trim_end_matches('/'), id);
            }
            other => absolutize_ids(other, base),
        }
    }
}

// ---------------------------------------------------------------------------
// Menu / offer documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub offers: Offer,
    pub image: Option<String>,
    /// Allergen tags, only when the page lists some.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuSection {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "hasMenuItem")]
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuDocument {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "hasMenuSection")]
    pub sections: Vec<MenuSection>,
}

/// The restaurant side of an offer document: just the link to its menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantMenuLink {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "hasMenu")]
    pub has_menu: IdRef,
}

/// `[restaurant link, menu]` as written to `jsonld/offer/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferDocument(pub RestaurantMenuLink, pub MenuDocument);

/// Build the offer document for a restaurant page with an extracted menu.
pub fn offer_document(
    menu: &ExtractedMenu,
    page_url: &str,
    rewriter: &RestaurantIdRewriter,
) -> OfferDocument {
    let menu_id = format!("{page_url}#menu");
    let sections = menu
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| menu_section(section, &format!("{menu_id}-section-{}", i + 1)))
        .collect();

    OfferDocument(
        RestaurantMenuLink {
            context: SCHEMA_CONTEXT.into(),
            id: rewriter.canonical(page_url),
            has_menu: IdRef::new(menu_id.clone()),
        },
        MenuDocument {
            context: SCHEMA_CONTEXT.into(),
            kind: "Menu".into(),
            id: menu_id,
            sections,
        },
    )
}

fn menu_section(section: &ExtractedSection, section_id: &str) -> MenuSection {
    MenuSection {
        kind: "MenuSection".into(),
        id: section_id.to_string(),
        name: section.name.clone(),
        items: section
            .items
            .iter()
            .enumerate()
            .map(|(j, item)| menu_item(item, &format!("{section_id}-item-{}", j + 1)))
            .collect(),
    }
}

fn menu_item(item: &ExtractedItem, item_id: &str) -> MenuItem {
    MenuItem {
        kind: "MenuItem".into(),
        id: item_id.to_string(),
        name: item.name.clone(),
        description: item.description.clone(),
        offers: Offer {
            kind: "Offer".into(),
            id: format!("{item_id}-offer"),
            price: item.price.clone(),
        },
        image: item.image.clone(),
        nutrition: item.allergens.clone(),
    }
}
