//! Named SPARQL queries over the scraped data.
//!
//! [`queries`] builds each query with its parameters bound through a
//! `VALUES` row; [`QueryCatalog`] runs them against a [`TripleStore`] and
//! turns rows into the flat records of [`records`].

pub mod params;
pub mod queries;
pub mod records;

use crate::error::QueryError;
use crate::triplestore::{Binding, TripleStore};

pub use params::{Param, PreparedQuery, QueryTemplate};
pub use queries::DEFAULT_MAX_DISTANCE;
pub use records::{
    AreaRecord, DeliveryServiceRecord, OpeningHoursRecord, PreferenceMatch, PriceRecord,
    RestaurantRecord,
};

pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Runs the named queries against one store.
pub struct QueryCatalog<'a> {
    store: &'a dyn TripleStore,
}

impl<'a> QueryCatalog<'a> {
    pub fn new(store: &'a dyn TripleStore) -> Self {
        Self { store }
    }

    fn rows(&self, query: PreparedQuery) -> QueryResult<Vec<Binding>> {
        let sparql = query.render()?;
        tracing::debug!(query = query.name(), "running named query");
        let results = self.store.query(&sparql)?;
        tracing::info!(query = query.name(), rows = results.len(), "query finished");
        Ok(results.rows)
    }

    pub fn restaurants(&self) -> QueryResult<Vec<RestaurantRecord>> {
        let rows = self.rows(queries::restaurant())?;
        Ok(rows.iter().map(RestaurantRecord::from_row).collect())
    }

    pub fn restaurants_by_name(&self, name: &str) -> QueryResult<Vec<RestaurantRecord>> {
        let rows = self.rows(queries::restaurant_name(name))?;
        Ok(rows.iter().map(RestaurantRecord::from_row).collect())
    }

    pub fn open_by_day_time(
        &self,
        day: &str,
        open_time: &str,
        close_time: &str,
    ) -> QueryResult<Vec<OpeningHoursRecord>> {
        let rows = self.rows(queries::open_by_day_time(day, open_time, close_time))?;
        Ok(rows.iter().map(OpeningHoursRecord::from_row).collect())
    }

    pub fn in_area(
        &self,
        central_lat: f64,
        central_long: f64,
        lat_range: f64,
        long_range: f64,
    ) -> QueryResult<Vec<AreaRecord>> {
        let rows = self.rows(queries::in_area(
            central_lat,
            central_long,
            lat_range,
            long_range,
        ))?;
        Ok(rows.iter().map(AreaRecord::from_row).collect())
    }

    pub fn price_range(&self, max_price: f64) -> QueryResult<Vec<PriceRecord>> {
        let rows = self.rows(queries::price_range(max_price))?;
        Ok(rows.iter().map(PriceRecord::from_row).collect())
    }

    pub fn delivery_services(&self) -> QueryResult<Vec<DeliveryServiceRecord>> {
        let rows = self.rows(queries::delivery_services())?;
        Ok(rows.iter().map(DeliveryServiceRecord::from_row).collect())
    }

    pub fn combined_prefs(
        &self,
        user_prefs_uri: &str,
        max_distance: f64,
    ) -> QueryResult<Vec<PreferenceMatch>> {
        let rows = self.rows(queries::combined_prefs(user_prefs_uri, max_distance))?;
        Ok(rows.iter().map(PreferenceMatch::from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triplestore::EmbeddedTripleStore;

    const FIXTURE: &str = r#"
        @prefix schema: <http://schema.org/> .
        @prefix lyon: <https://lyon.coopcycle.org/en/restaurant/1-chez-paul#> .

        <https://lyon.coopcycle.org/api/restaurants/1> a schema:Restaurant ;
            schema:name "Chez Paul" ;
            schema:description "Bouchon lyonnais" ;
            schema:image "https://lyon.coopcycle.org/img/a.jpg" ;
            schema:address [
                a schema:PostalAddress ;
                schema:streetAddress "1 rue Merciere" ;
                schema:telephone "+33 4 00 00 00 00" ;
                schema:geo [ schema:latitude 45.75 ; schema:longitude 4.85 ]
            ] ;
            schema:openingHoursSpecification [
                schema:dayOfWeek "Monday" ; schema:opens "11:00" ; schema:closes "22:00"
            ] ;
            schema:hasMenu lyon:menu .
        lyon:menu schema:hasMenuSection lyon:menu-section-1 .
        lyon:menu-section-1 schema:hasMenuItem lyon:menu-section-1-item-1, lyon:menu-section-1-item-2 .
        lyon:menu-section-1-item-1 schema:name "Soupe" ; schema:offers [ schema:price "6,50 €" ] .
        lyon:menu-section-1-item-2 schema:name "Quenelles" ; schema:offers [ schema:price "12,00 €" ] .

        <https://paris.coopcycle.org/api/restaurants/7> a schema:Restaurant ;
            schema:name "Le Bistrot" ;
            schema:geo [ schema:latitude 48.85 ; schema:longitude 2.35 ] ;
            schema:hasMenu <https://paris.coopcycle.org/en/restaurant/7-le-bistrot#menu> .
        <https://paris.coopcycle.org/en/restaurant/7-le-bistrot#menu>
            schema:hasMenuSection <https://paris.coopcycle.org/en/restaurant/7-le-bistrot#menu-section-1> .
        <https://paris.coopcycle.org/en/restaurant/7-le-bistrot#menu-section-1>
            schema:hasMenuItem <https://paris.coopcycle.org/en/restaurant/7-le-bistrot#menu-section-1-item-1> .
        <https://paris.coopcycle.org/en/restaurant/7-le-bistrot#menu-section-1-item-1>
            schema:name "Steak" ; schema:offers [ schema:price "30 €" ] .

        <https://lyon.coopcycle.org> a schema:Service ;
            schema:name "Les Coursiers Lyonnais" ;
            schema:serviceType "DeliveryService" ;
            schema:areaServed [ schema:address [ schema:addressCountry "fr" ; schema:addressLocality "Lyon" ] ] .
        <https://nowhere.coopcycle.org> a schema:Service ;
            schema:serviceType "DeliveryService" .

        <http://localhost/preferences#me> a schema:Person ;
            schema:seeks <http://localhost/preferences#seeks> .
        <http://localhost/preferences#seeks>
            schema:availableAtOrFrom <http://localhost/preferences#geoMidpoint> ;
            schema:priceSpecification <http://localhost/preferences#price> .
        <http://localhost/preferences#geoMidpoint> schema:latitude "45.76" ; schema:longitude "4.83" .
        <http://localhost/preferences#price> schema:maxPrice "15" .
    "#;

    fn loaded_store() -> EmbeddedTripleStore {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        store.upload(FIXTURE, None).unwrap();
        store
    }

    #[test]
    fn restaurants_are_sorted_with_placeholders() {
        let store = loaded_store();
        let records = QueryCatalog::new(&store).restaurants().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            RestaurantRecord {
                name: "Chez Paul".into(),
                description: "Bouchon lyonnais".into(),
                image: "https://lyon.coopcycle.org/img/a.jpg".into(),
                address: "1 rue Merciere".into(),
                telephone: "+33 4 00 00 00 00".into(),
            }
        );
        assert_eq!(records[1].name, "Le Bistrot");
        assert_eq!(records[1].description, "Unknown");
        assert_eq!(records[1].image, "");
    }

    #[test]
    fn restaurants_in_a_named_graph_are_listed() {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        store
            .upload(FIXTURE, Some("http://localhost/graphs/restaurants"))
            .unwrap();
        let records = QueryCatalog::new(&store).restaurants().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Chez Paul");
    }

    #[test]
    fn name_search_ignores_case() {
        let store = loaded_store();
        let records = QueryCatalog::new(&store).restaurants_by_name("PAUL").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Chez Paul");
    }

    #[test]
    fn name_search_with_quotes_matches_nothing() {
        let store = loaded_store();
        let records = QueryCatalog::new(&store)
            .restaurants_by_name(r#"" || true || ""#)
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn price_range_normalizes_prices() {
        let store = loaded_store();
        let records = QueryCatalog::new(&store).price_range(10.5).unwrap();
        assert_eq!(
            records,
            vec![PriceRecord {
                restaurant: "Chez Paul".into(),
                menu_item: "Soupe".into(),
                price: "6,50 €".into(),
            }]
        );
    }

    #[test]
    fn open_by_day_time_compares_hours() {
        let store = loaded_store();
        let catalog = QueryCatalog::new(&store);
        let open = catalog.open_by_day_time("Monday", "11:30", "21:00").unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].opens, "11:00");
        assert!(catalog.open_by_day_time("Monday", "10:00", "21:00").unwrap().is_empty());
        assert!(catalog.open_by_day_time("Sunday", "11:30", "21:00").unwrap().is_empty());
    }

    #[test]
    fn in_area_uses_bounding_box() {
        let store = loaded_store();
        let records = QueryCatalog::new(&store).in_area(45.76, 4.83, 0.1, 0.1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Chez Paul");
        assert_eq!(records[0].restaurant, "https://lyon.coopcycle.org/api/restaurants/1");
    }

    #[test]
    fn delivery_services_fill_missing_location() {
        let store = loaded_store();
        let records = QueryCatalog::new(&store).delivery_services().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.contains(&DeliveryServiceRecord {
            name: "Les Coursiers Lyonnais".into(),
            country: "fr".into(),
            locality: "Lyon".into(),
        }));
        assert!(records.contains(&DeliveryServiceRecord {
            name: "Unknown".into(),
            country: "Not available".into(),
            locality: "Not available".into(),
        }));
    }

    #[test]
    fn combined_prefs_keeps_nearby_restaurants() {
        let store = loaded_store();
        let matches = QueryCatalog::new(&store)
            .combined_prefs("http://localhost/preferences#me", DEFAULT_MAX_DISTANCE)
            .unwrap();
        assert!(!matches.is_empty());
        assert!(matches.iter().all(|m| m.name == "Chez Paul"));
        assert!(matches.iter().all(|m| m.day == "Monday"));
    }

    #[test]
    fn combined_prefs_for_unknown_user_is_empty() {
        let store = loaded_store();
        let matches = QueryCatalog::new(&store)
            .combined_prefs("http://localhost/preferences#nobody", DEFAULT_MAX_DISTANCE)
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn invalid_parameter_never_reaches_the_store() {
        let store = loaded_store();
        let err = QueryCatalog::new(&store).price_range(f64::INFINITY).unwrap_err();
        assert!(matches!(err, QueryError::Param { .. }));
    }
}
