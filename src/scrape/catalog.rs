//! Upstream service catalog (`coopcycle.json`).
//!
//! The feed is a JSON array with one loosely-typed object per federation
//! member. Entries that do not deserialize are kept as holes so every entry
//! keeps its feed position, which is the `{i}` in every output path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScrapeError;

/// Fields checked, in order, for the service's own site URL.
pub const SERVICE_URL_FIELDS: [&str; 3] = ["coopcycle_url", "url", "website"];

/// One row of the upstream directory feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceCatalogEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Number or numeric string, passed through untouched.
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
    #[serde(default)]
    pub facebook_url: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub instagram_url: Option<String>,
    /// Localized descriptions keyed by language tag.
    #[serde(default)]
    pub text: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub coopcycle_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl ServiceCatalogEntry {
    fn url_field(&self, field: &str) -> Option<&str> {
        match field {
            "coopcycle_url" => self.coopcycle_url.as_deref(),
            "url" => self.url.as_deref(),
            "website" => self.website.as_deref(),
            _ => None,
        }
    }

    /// Base URL (`scheme://host`) of the service site.
    ///
    /// Checks [`SERVICE_URL_FIELDS`] in order and takes the first value hosted
    /// under `federation_domain`.
    pub fn service_url(&self, federation_domain: &str) -> Option<String> {
        SERVICE_URL_FIELDS
            .iter()
            .filter_map(|field| self.url_field(field))
            .filter_map(base_url)
            .find(|base| host_of(base).is_some_and(|h| is_under(h, federation_domain)))
    }

    /// Both coordinates, when the feed carries them.
    pub fn coordinates(&self) -> Option<(&Value, &Value)> {
        match (&self.latitude, &self.longitude) {
            (Some(lat), Some(long)) if !lat.is_null() && !long.is_null() => Some((lat, long)),
            _ => None,
        }
    }
}

/// A catalog entry whose service site was detected.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRef {
    /// Position in the feed.
    pub index: usize,
    /// `scheme://host` of the service site.
    pub base_url: String,
    /// Host without the federation domain, e.g. `lyon`.
    pub slug: String,
}

/// Parsed service catalog.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    entries: Vec<Option<ServiceCatalogEntry>>,
}

impl ServiceCatalog {
    /// Parse the raw feed. Only a non-array top level is fatal.
    pub fn from_value(feed: &Value) -> Result<Self, ScrapeError> {
        let rows = feed.as_array().ok_or_else(|| ScrapeError::Catalog {
            message: format!("top-level value is {}", json_kind(feed)),
        })?;

        let entries = rows
            .iter()
            .enumerate()
            .map(|(index, row)| match serde_json::from_value(row.clone()) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping malformed catalog entry");
                    None
                }
            })
            .collect();

        Ok(Self { entries })
    }

    /// Entries that deserialized, with their feed position.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &ServiceCatalogEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e)))
    }

    /// Entries whose service site could be detected.
    pub fn services(&self, federation_domain: &str) -> Vec<ServiceRef> {
        self.entries()
            .filter_map(|(index, entry)| {
                let base_url = entry.service_url(federation_domain)?;
                let slug = service_slug(&base_url, federation_domain);
                Some(ServiceRef {
                    index,
                    base_url,
                    slug,
                })
            })
            .collect()
    }

    /// Number of feed positions, including malformed ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reduce a URL to `scheme://host`.
pub fn base_url(url: &str) -> Option<String> {
    let (scheme, rest) = url.trim().split_once("://")?;
    if scheme != "http" && scheme != "https" {
        return None;
    }
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return None;
    }
    Some(format!("{scheme}://{host}"))
}

fn host_of(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    rest.split(['/', '?', '#']).next()
}

fn is_under(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Short service name used in output paths: the host minus the federation domain.
pub fn service_slug(base_url: &str, federation_domain: &str) -> String {
    let host = host_of(base_url).unwrap_or(base_url);
    host.strip_suffix(federation_domain)
        .and_then(|h| h.strip_suffix('.'))
        .filter(|h| !h.is_empty())
        .unwrap_or(host)
        .to_string()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
