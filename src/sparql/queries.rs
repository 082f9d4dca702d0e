//! The named query templates.
//!
//! Coordinates are cast with `xsd:decimal(...)`, which accepts both the plain
//! literals of the preference graph and the numeric literals JSON-LD numbers
//! become. Menu prices are free text ("12,50 €") and are normalized with
//! `REPLACE` before the cast.

use super::params::{Param, PreparedQuery, QueryTemplate};

const RESTAURANT: QueryTemplate = QueryTemplate {
    name: "restaurant",
    head: r#"PREFIX schema: <http://schema.org/>
SELECT ?restaurantName
       (GROUP_CONCAT(DISTINCT ?image; separator=", ") AS ?images)
       (GROUP_CONCAT(DISTINCT ?streetAddress; separator=", ") AS ?addresses)
       ?description ?telephone"#,
    body: r#"  ?restaurant a schema:Restaurant ;
              schema:name ?restaurantName .
  OPTIONAL { ?restaurant schema:description ?description }
  OPTIONAL { ?restaurant schema:image ?image }
  OPTIONAL { ?restaurant schema:address/schema:streetAddress ?streetAddress }
  OPTIONAL { ?restaurant schema:telephone|schema:address/schema:telephone ?telephone }"#,
    modifiers: r#"GROUP BY ?restaurantName ?description ?telephone
ORDER BY ?restaurantName
LIMIT 500"#,
};

const RESTAURANT_NAME: QueryTemplate = QueryTemplate {
    name: "restaurant_name",
    head: RESTAURANT.head,
    body: r#"  ?restaurant a schema:Restaurant ;
              schema:name ?restaurantName .
  FILTER(CONTAINS(LCASE(STR(?restaurantName)), LCASE(?needle)))
  OPTIONAL { ?restaurant schema:description ?description }
  OPTIONAL { ?restaurant schema:image ?image }
  OPTIONAL { ?restaurant schema:address/schema:streetAddress ?streetAddress }
  OPTIONAL { ?restaurant schema:telephone|schema:address/schema:telephone ?telephone }"#,
    modifiers: RESTAURANT.modifiers,
};

const OPEN_BY_DAY_TIME: QueryTemplate = QueryTemplate {
    name: "open_by_day_time",
    head: r#"PREFIX schema: <http://schema.org/>
SELECT DISTINCT ?restaurantName ?openDay ?opens ?closes"#,
    body: r#"  ?restaurant a schema:Restaurant ;
              schema:name ?restaurantName ;
              schema:openingHoursSpecification ?hours .
  ?hours schema:dayOfWeek ?openDay ;
         schema:opens ?opens ;
         schema:closes ?closes .
  FILTER(CONTAINS(STR(?openDay), ?day))
  FILTER(STR(?opens) <= ?openTime && STR(?closes) >= ?closeTime)"#,
    modifiers: "ORDER BY ?restaurantName ?opens",
};

const IN_AREA: QueryTemplate = QueryTemplate {
    name: "in_area",
    head: r#"PREFIX schema: <http://schema.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT DISTINCT ?restaurant ?restaurantName ?latitude ?longitude"#,
    body: r#"  ?restaurant a schema:Restaurant ;
              schema:name ?restaurantName ;
              schema:address/schema:geo|schema:geo ?geo .
  ?geo schema:latitude ?lat ;
       schema:longitude ?long .
  BIND(xsd:decimal(?lat) AS ?latitude)
  BIND(xsd:decimal(?long) AS ?longitude)
  FILTER(?latitude >= ?centralLat - ?latRange && ?latitude <= ?centralLat + ?latRange)
  FILTER(?longitude >= ?centralLong - ?longRange && ?longitude <= ?centralLong + ?longRange)"#,
    modifiers: r#"ORDER BY ?restaurantName
LIMIT 10"#,
};

const PRICE_RANGE: QueryTemplate = QueryTemplate {
    name: "price_range",
    head: r#"PREFIX schema: <http://schema.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT DISTINCT ?restaurantName ?menuItemName ?priceLiteral"#,
    body: r#"  ?restaurant a schema:Restaurant ;
              schema:name ?restaurantName ;
              schema:hasMenu/schema:hasMenuSection/schema:hasMenuItem ?menuItem .
  ?menuItem schema:name ?menuItemName ;
            schema:offers/schema:price ?priceLiteral .
  BIND(xsd:decimal(REPLACE(REPLACE(STR(?priceLiteral), "[^0-9,.]", ""), ",", ".")) AS ?price)
  FILTER(?price <= ?maxPrice)"#,
    modifiers: "ORDER BY ?restaurantName ?price ?menuItemName",
};

const DELIVERY_SERVICES: QueryTemplate = QueryTemplate {
    name: "delivery_services",
    head: r#"PREFIX schema: <http://schema.org/>
SELECT DISTINCT ?serviceName ?addressCountry ?addressLocality"#,
    body: r#"  ?service a schema:Service ;
           schema:serviceType "DeliveryService" .
  OPTIONAL { ?service schema:name ?serviceName }
  OPTIONAL { ?service schema:areaServed/schema:address/schema:addressCountry ?addressCountry }
  OPTIONAL { ?service schema:areaServed/schema:address/schema:addressLocality ?addressLocality }"#,
    modifiers: "ORDER BY ?addressCountry ?addressLocality ?serviceName",
};

const COMBINED_PREFS: QueryTemplate = QueryTemplate {
    name: "combined_prefs",
    head: r#"PREFIX schema: <http://schema.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT DISTINCT ?restaurant ?restaurantName ?distance ?openDay ?opens ?closes ?price"#,
    body: r#"  ?user a schema:Person ;
        schema:seeks ?demand .
  ?demand schema:availableAtOrFrom ?midpoint .
  ?midpoint schema:latitude ?userLatRaw ;
            schema:longitude ?userLongRaw .
  OPTIONAL { ?demand schema:priceSpecification/schema:maxPrice ?maxPriceRaw }
  ?restaurant a schema:Restaurant ;
              schema:name ?restaurantName ;
              schema:address/schema:geo|schema:geo ?geo .
  ?geo schema:latitude ?latRaw ;
       schema:longitude ?longRaw .
  OPTIONAL {
    ?restaurant schema:openingHoursSpecification ?hours .
    ?hours schema:dayOfWeek ?openDay ;
           schema:opens ?opens ;
           schema:closes ?closes .
  }
  OPTIONAL {
    ?restaurant schema:hasMenu/schema:hasMenuSection/schema:hasMenuItem/schema:offers/schema:price ?priceLiteral .
  }
  BIND(xsd:decimal(?userLatRaw) AS ?userLat)
  BIND(xsd:decimal(?userLongRaw) AS ?userLong)
  BIND(xsd:decimal(REPLACE(REPLACE(STR(?maxPriceRaw), "[^0-9,.]", ""), ",", ".")) AS ?maxPrice)
  BIND(xsd:decimal(REPLACE(REPLACE(STR(?priceLiteral), "[^0-9,.]", ""), ",", ".")) AS ?price)
  BIND(xsd:decimal(?latRaw) - ?userLat AS ?dLat)
  BIND(xsd:decimal(?longRaw) - ?userLong AS ?dLong)
  BIND(?dLat * ?dLat + ?dLong * ?dLong AS ?distance)
  FILTER(?distance <= ?maxDistance || ?price <= ?maxPrice)"#,
    modifiers: r#"ORDER BY ?distance ?price
LIMIT 10"#,
};

/// Default squared-degree radius for [`combined_prefs`].
pub const DEFAULT_MAX_DISTANCE: f64 = 0.9;

/// Every restaurant with its description, first image and address.
pub fn restaurant() -> PreparedQuery {
    PreparedQuery::new(RESTAURANT)
}

/// Restaurants whose name contains `name`, ignoring case.
pub fn restaurant_name(name: &str) -> PreparedQuery {
    PreparedQuery::new(RESTAURANT_NAME).bind("needle", Param::Text(name.to_string()))
}

/// Restaurants open on `day` from at latest `open_time` until at least
/// `close_time` (`HH:MM`, compared as text).
pub fn open_by_day_time(day: &str, open_time: &str, close_time: &str) -> PreparedQuery {
    PreparedQuery::new(OPEN_BY_DAY_TIME)
        .bind("day", Param::Text(day.to_string()))
        .bind("openTime", Param::Text(open_time.to_string()))
        .bind("closeTime", Param::Text(close_time.to_string()))
}

/// Restaurants inside a latitude/longitude bounding box.
pub fn in_area(central_lat: f64, central_long: f64, lat_range: f64, long_range: f64) -> PreparedQuery {
    PreparedQuery::new(IN_AREA)
        .bind("centralLat", Param::Decimal(central_lat))
        .bind("centralLong", Param::Decimal(central_long))
        .bind("latRange", Param::Decimal(lat_range))
        .bind("longRange", Param::Decimal(long_range))
}

/// Menu items priced at most `max_price`.
pub fn price_range(max_price: f64) -> PreparedQuery {
    PreparedQuery::new(PRICE_RANGE).bind("maxPrice", Param::Decimal(max_price))
}

/// Every CoopCycle delivery service with its location.
pub fn delivery_services() -> PreparedQuery {
    PreparedQuery::new(DELIVERY_SERVICES)
}

/// Restaurants near the person `user_prefs_uri` or within their budget.
pub fn combined_prefs(user_prefs_uri: &str, max_distance: f64) -> PreparedQuery {
    PreparedQuery::new(COMBINED_PREFS)
        .bind("user", Param::Iri(user_prefs_uri.to_string()))
        .bind("maxDistance", Param::Decimal(max_distance))
}
