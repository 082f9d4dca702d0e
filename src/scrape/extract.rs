//! HTML extraction using the `scraper` crate.
//!
//! Pulls restaurant links off a service's shop listing, the JSON-LD blocks a
//! restaurant page embeds, and the menu tree rendered in its `#menu`
//! container. Structural absence is never an error: a missing container is an
//! empty result and a missing field is `None`.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

/// Marker id of the shop listing container.
pub const SHOPS_LIST_ID: &str = "shops-list";
/// Marker id of the menu container.
pub const MENU_ID: &str = "menu";

static SHOPS_LIST: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#shops-list").expect("static selector must parse"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector must parse"));
static JSONLD_SCRIPT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector must parse")
});
static MENU: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#menu").expect("static selector must parse"));
static HEADING_OR_SECTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h2, div.restaurant-menu-section").expect("static selector must parse")
});
static SECTION_ITEM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.restaurant-menu-section-item").expect("static selector must parse")
});
static ITEM_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h5.menu-item-name").expect("static selector must parse"));
static ITEM_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("small.menu-item-description").expect("static selector must parse")
});
static ITEM_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.menu-item-price").expect("static selector must parse"));
static ITEM_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("static selector must parse"));
static ITEM_ALLERGENS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("small.menu-item-allergens span").expect("static selector must parse")
});

/// Relative path of one restaurant page on a service site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RestaurantListing {
    /// Path as found in the href, e.g. `/en/restaurant/42-chez-paul`.
    pub path: String,
    /// Numeric id, e.g. `42`.
    pub id: String,
    /// Human-readable part after the id, possibly empty.
    pub slug: String,
}

impl RestaurantListing {
    /// Parse an href that starts with `prefix`.
    ///
    /// The first path segment after the prefix is `{id}-{slug}` or just `{id}`.
    pub fn parse(href: &str, prefix: &str) -> Option<Self> {
        let rest = href.strip_prefix(prefix)?;
        let segment = rest.split(['/', '?', '#']).next()?;
        let (id, slug) = segment.split_once('-').unwrap_or((segment, ""));
        if id.is_empty() {
            return None;
        }
        Some(Self {
            path: href.to_string(),
            id: id.to_string(),
            slug: slug.to_string(),
        })
    }

    /// File name stem used by the document store.
    pub fn file_stem(&self) -> String {
        if self.slug.is_empty() {
            self.id.clone()
        } else {
            format!("{}-{}", self.id, self.slug)
        }
    }
}

/// Restaurant links inside the `#shops-list` container, in document order.
///
/// Returns an empty list when the container is absent.
pub fn restaurant_listings(html: &str, prefix: &str) -> Vec<RestaurantListing> {
    let document = Html::parse_document(html);
    let Some(container) = document.select(&SHOPS_LIST).next() else {
        return Vec::new();
    };

    let mut listings: Vec<RestaurantListing> = Vec::new();
    for anchor in container.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.starts_with(prefix) {
            continue;
        }
        match RestaurantListing::parse(href, prefix) {
            Some(listing) if !listings.contains(&listing) => listings.push(listing),
            Some(_) => {}
            None => tracing::debug!(href, "restaurant link without an id"),
        }
    }
    listings
}

/// Every JSON-LD block embedded in the page; invalid blocks are skipped.
pub fn embedded_jsonld(html: &str) -> Vec<Value> {
    let document = Html::parse_document(html);
    document
        .select(&JSONLD_SCRIPT)
        .filter_map(|script| {
            let raw = script.text().collect::<String>();
            match serde_json::from_str::<Value>(raw.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable JSON-LD block");
                    None
                }
            }
        })
        .collect()
}

/// One menu item as rendered in the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub image: Option<String>,
    pub allergens: Option<Vec<String>>,
}

/// One menu section with its items in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedSection {
    pub name: Option<String>,
    pub items: Vec<ExtractedItem>,
}

/// A restaurant menu in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMenu {
    pub sections: Vec<ExtractedSection>,
}

/// Extract the menu rendered inside `#menu`.
///
/// `None` means the page has no menu container. A section's name is the text
/// of the closest `h2` preceding it in document order, wherever it sits.
pub fn menu(html: &str) -> Option<ExtractedMenu> {
    let document = Html::parse_document(html);
    let container = document.select(&MENU).next()?;
    let container_id = container.id();

    let mut sections = Vec::new();
    let mut last_heading: Option<String> = None;

    for el in document.select(&HEADING_OR_SECTION) {
        if el.value().name() == "h2" {
            last_heading = non_empty(text_of(el));
            continue;
        }
        if !el.ancestors().any(|node| node.id() == container_id) {
            continue;
        }
        sections.push(ExtractedSection {
            name: last_heading.clone(),
            items: el.select(&SECTION_ITEM).map(extract_item).collect(),
        });
    }

    Some(ExtractedMenu { sections })
}

fn extract_item(item: ElementRef<'_>) -> ExtractedItem {
    ExtractedItem {
        name: first_text(item, &ITEM_NAME),
        description: first_text(item, &ITEM_DESCRIPTION),
        price: first_text(item, &ITEM_PRICE),
        image: item
            .select(&ITEM_IMAGE)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string),
        allergens: first_text(item, &ITEM_ALLERGENS)
            .map(|text| {
                text.split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|allergens| !allergens.is_empty()),
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().map(text_of)
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "/en/restaurant/";

    #[test]
    fn listing_parses_id_and_slug() {
        let listing = RestaurantListing::parse("/en/restaurant/42-chez-paul", PREFIX).unwrap();
        assert_eq!(listing.id, "42");
        assert_eq!(listing.slug, "chez-paul");
        assert_eq!(listing.file_stem(), "42-chez-paul");

        let bare = RestaurantListing::parse("/en/restaurant/7", PREFIX).unwrap();
        assert_eq!(bare.slug, "");
        assert_eq!(bare.file_stem(), "7");

        assert!(RestaurantListing::parse("/en/restaurant/", PREFIX).is_none());
        assert!(RestaurantListing::parse("/en/shops", PREFIX).is_none());
    }

    #[test]
    fn listings_inside_container_only() {
        let html = r#"
        <html><body>
            <nav><a href="/en/restaurant/1-outside">Outside</a></nav>
            <div id="shops-list">
                <a href="/en/restaurant/12-la-cantine">La Cantine</a>
                <a href="/en/about">About</a>
                <a href="/en/restaurant/12-la-cantine">La Cantine (again)</a>
                <div><a href="/en/restaurant/31-pho">Pho</a></div>
            </div>
        </body></html>"#;
        let listings = restaurant_listings(html, PREFIX);
        let paths: Vec<&str> = listings.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(paths, vec!["/en/restaurant/12-la-cantine", "/en/restaurant/31-pho"]);
    }

    #[test]
    fn missing_shops_list_is_empty() {
        let html = r#"<html><body><a href="/en/restaurant/1-x">x</a></body></html>"#;
        assert!(restaurant_listings(html, PREFIX).is_empty());
    }

    #[test]
    fn embedded_jsonld_skips_invalid_blocks() {
        let html = r#"
        <html><head>
            <script type="application/ld+json">{"@type": "Restaurant", "name": "Pho"}</script>
            <script type="application/ld+json">{ not json </script>
            <script type="text/javascript">var x = 1;</script>
        </head></html>"#;
        let blocks = embedded_jsonld(html);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["name"], "Pho");
    }

    const MENU_PAGE: &str = r#"
    <html><body>
        <h2>Not a section title</h2>
        <div id="menu">
            <h2>Starters</h2>
            <div class="restaurant-menu-section">
                <div class="restaurant-menu-section-item">
                    <h5 class="menu-item-name"> Nems </h5>
                    <small class="menu-item-description">Four spring rolls</small>
                    <span class="menu-item-price">6.50 €</span>
                    <img src="https://cdn.example/nems.jpg">
                    <small class="menu-item-allergens">Allergens: <span>gluten, soy</span></small>
                </div>
                <div class="restaurant-menu-section-item">
                    <h5 class="menu-item-name">Soup</h5>
                </div>
            </div>
            <h2>Mains</h2>
            <div class="restaurant-menu-section">
                <div class="restaurant-menu-section-item">
                    <h5 class="menu-item-name">Pho bo</h5>
                    <span class="menu-item-price">12,00 €</span>
                </div>
            </div>
        </div>
        <div class="restaurant-menu-section">
            <div class="restaurant-menu-section-item"><h5 class="menu-item-name">Ad</h5></div>
        </div>
    </body></html>"#;

    #[test]
    fn menu_counts_match_source_containers() {
        let menu = menu(MENU_PAGE).unwrap();
        assert_eq!(menu.sections.len(), 2);
        assert_eq!(menu.sections[0].items.len(), 2);
        assert_eq!(menu.sections[1].items.len(), 1);
        assert_eq!(menu.sections[0].name.as_deref(), Some("Starters"));
        assert_eq!(menu.sections[1].name.as_deref(), Some("Mains"));
    }

    #[test]
    fn menu_item_fields_and_missing_markers() {
        let menu = menu(MENU_PAGE).unwrap();
        let nems = &menu.sections[0].items[0];
        assert_eq!(nems.name.as_deref(), Some("Nems"));
        assert_eq!(nems.description.as_deref(), Some("Four spring rolls"));
        assert_eq!(nems.price.as_deref(), Some("6.50 €"));
        assert_eq!(nems.image.as_deref(), Some("https://cdn.example/nems.jpg"));
        assert_eq!(
            nems.allergens.as_deref(),
            Some(&["gluten".to_string(), "soy".to_string()][..])
        );

        let soup = &menu.sections[0].items[1];
        assert_eq!(soup.name.as_deref(), Some("Soup"));
        assert_eq!(soup.description, None);
        assert_eq!(soup.price, None);
        assert_eq!(soup.image, None);
        assert_eq!(soup.allergens, None);
    }

    #[test]
    fn page_without_menu_container_has_no_menu() {
        let html = r#"<html><body><h2>Closed</h2><p>No menu today.</p></body></html>"#;
        assert!(menu(html).is_none());
    }

    #[test]
    fn empty_menu_container_yields_zero_sections() {
        let html = r#"<html><body><div id="menu"></div></body></html>"#;
        assert_eq!(menu(html).unwrap().sections.len(), 0);
    }

    #[test]
    fn blank_allergen_list_is_absent() {
        let html = r#"
        <html><body><div id="menu">
            <div class="restaurant-menu-section">
                <div class="restaurant-menu-section-item">
                    <h5 class="menu-item-name">Salade</h5>
                    <small class="menu-item-allergens">Allergens: <span> </span></small>
                </div>
                <div class="restaurant-menu-section-item">
                    <h5 class="menu-item-name">Tarte</h5>
                    <small class="menu-item-allergens">Allergens: <span>gluten,egg</span></small>
                </div>
            </div>
        </div></body></html>"#;
        let menu = menu(html).unwrap();
        let items = &menu.sections[0].items;
        assert_eq!(items[0].allergens, None);
        assert_eq!(
            items[1].allergens.as_deref(),
            Some(&["gluten".to_string(), "egg".to_string()][..])
        );
    }

    #[test]
    fn section_without_any_heading_has_no_name() {
        let html = r#"
        <html><body><div id="menu">
            <div class="restaurant-menu-section">
                <div class="restaurant-menu-section-item"></div>
            </div>
        </div></body></html>"#;
        let menu = menu(html).unwrap();
        assert_eq!(menu.sections[0].name, None);
        assert_eq!(menu.sections[0].items[0], ExtractedItem::default());
    }
}
