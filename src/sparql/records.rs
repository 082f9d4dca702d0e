//! Flat records built from query rows.

use serde::Serialize;

use crate::triplestore::Binding;

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "Not available";

fn value_or(row: &Binding, var: &str, placeholder: &str) -> String {
    row.get(var)
        .map(|v| v.value.clone())
        .unwrap_or_else(|| placeholder.to_string())
}

/// First entry of a `", "`-joined aggregate, or `""`.
fn first_of(row: &Binding, var: &str) -> String {
    row.get(var)
        .and_then(|v| v.value.split(", ").next())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestaurantRecord {
    pub name: String,
    pub description: String,
    pub image: String,
    pub address: String,
    pub telephone: String,
}

impl RestaurantRecord {
    pub fn from_row(row: &Binding) -> Self {
        Self {
            name: value_or(row, "restaurantName", UNKNOWN),
            description: value_or(row, "description", UNKNOWN),
            image: first_of(row, "images"),
            address: first_of(row, "addresses"),
            telephone: value_or(row, "telephone", UNKNOWN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpeningHoursRecord {
    pub name: String,
    pub day: String,
    pub opens: String,
    pub closes: String,
}

impl OpeningHoursRecord {
    pub fn from_row(row: &Binding) -> Self {
        Self {
            name: value_or(row, "restaurantName", UNKNOWN),
            day: value_or(row, "openDay", UNKNOWN),
            opens: value_or(row, "opens", UNKNOWN),
            closes: value_or(row, "closes", UNKNOWN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaRecord {
    pub restaurant: String,
    pub name: String,
    pub latitude: String,
    pub longitude: String,
}

impl AreaRecord {
    pub fn from_row(row: &Binding) -> Self {
        Self {
            restaurant: value_or(row, "restaurant", UNKNOWN),
            name: value_or(row, "restaurantName", UNKNOWN),
            latitude: value_or(row, "latitude", UNKNOWN),
            longitude: value_or(row, "longitude", UNKNOWN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRecord {
    pub restaurant: String,
    #[serde(rename = "menuItem")]
    pub menu_item: String,
    pub price: String,
}

impl PriceRecord {
    pub fn from_row(row: &Binding) -> Self {
        Self {
            restaurant: value_or(row, "restaurantName", UNKNOWN),
            menu_item: value_or(row, "menuItemName", UNKNOWN),
            price: value_or(row, "priceLiteral", UNKNOWN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryServiceRecord {
    pub name: String,
    pub country: String,
    pub locality: String,
}

impl DeliveryServiceRecord {
    pub fn from_row(row: &Binding) -> Self {
        Self {
            name: value_or(row, "serviceName", UNKNOWN),
            country: value_or(row, "addressCountry", NOT_AVAILABLE),
            locality: value_or(row, "addressLocality", NOT_AVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceMatch {
    pub restaurant: String,
    pub name: String,
    pub distance: String,
    pub day: String,
    pub opens: String,
    pub closes: String,
    pub price: String,
}

impl PreferenceMatch {
    pub fn from_row(row: &Binding) -> Self {
        Self {
            restaurant: value_or(row, "restaurant", UNKNOWN),
            name: value_or(row, "restaurantName", UNKNOWN),
            distance: value_or(row, "distance", UNKNOWN),
            day: value_or(row, "openDay", UNKNOWN),
            opens: value_or(row, "opens", UNKNOWN),
            closes: value_or(row, "closes", UNKNOWN),
            price: value_or(row, "price", UNKNOWN),
        }
    }
}
