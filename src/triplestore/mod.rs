//! Triple-store access: SPARQL query/update and graph-store upload/delete.
//!
//! [`RemoteTripleStore`] talks SPARQL 1.1 Protocol and Graph Store Protocol
//! to a Fuseki-style server; [`EmbeddedTripleStore`] runs the same operations
//! against a local `oxigraph` store.

mod embedded;
mod remote;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{StoreConfig, StoreKind};
use crate::error::TripleStoreError;

pub use embedded::EmbeddedTripleStore;
pub use remote::RemoteTripleStore;

pub type StoreResult<T> = std::result::Result<T, TripleStoreError>;

/// One bound RDF term in SPARQL JSON results form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdfValue {
    /// `uri`, `literal`, `bnode` or `triple`.
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl RdfValue {
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: "uri".into(),
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: "literal".into(),
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }
}

/// Variable name to bound value; unbound variables are absent.
pub type Binding = BTreeMap<String, RdfValue>;

/// Result of a SPARQL query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparqlResults {
    pub vars: Vec<String>,
    pub rows: Vec<Binding>,
    /// Set for ASK queries.
    pub boolean: Option<bool>,
}

#[derive(Deserialize)]
struct RawResults {
    #[serde(default)]
    head: RawHead,
    #[serde(default)]
    results: Option<RawBindings>,
    #[serde(default)]
    boolean: Option<bool>,
}

#[derive(Default, Deserialize)]
struct RawHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct RawBindings {
    bindings: Vec<Binding>,
}

impl SparqlResults {
    /// Parse an `application/sparql-results+json` document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawResults = serde_json::from_str(json)?;
        Ok(Self {
            vars: raw.head.vars,
            rows: raw.results.map(|r| r.bindings).unwrap_or_default(),
            boolean: raw.boolean,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lexical value of `var` in every row that binds it.
    pub fn column<'a>(&'a self, var: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows
            .iter()
            .filter_map(move |row| row.get(var).map(|v| v.value.as_str()))
    }
}

/// Operations every triple-store backend supports.
pub trait TripleStore {
    /// Run a SPARQL query.
    fn query(&self, sparql: &str) -> StoreResult<SparqlResults>;

    /// Run a SPARQL update.
    fn update(&self, sparql_update: &str) -> StoreResult<()>;

    /// Add Turtle data to `graph`, or to the default graph when `None`.
    fn upload(&self, turtle: &str, graph: Option<&str>) -> StoreResult<()>;

    /// Drop every triple of `graph`, or of the default graph when `None`.
    fn delete(&self, graph: Option<&str>) -> StoreResult<()>;
}

/// Build the backend selected by `config.kind`.
pub fn open_store(config: &StoreConfig) -> StoreResult<Box<dyn TripleStore>> {
    match config.kind {
        StoreKind::Remote => Ok(Box::new(RemoteTripleStore::new(config))),
        StoreKind::Embedded => match &config.path {
            Some(path) => Ok(Box::new(EmbeddedTripleStore::open(path)?)),
            None => Ok(Box::new(EmbeddedTripleStore::in_memory()?)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_results() {
        let json = r#"{
            "head": {"vars": ["s", "name"]},
            "results": {"bindings": [
                {"s": {"type": "uri", "value": "http://example.org/r1"},
                 "name": {"type": "literal", "value": "Chez Paul", "xml:lang": "fr"}},
                {"s": {"type": "uri", "value": "http://example.org/r2"}}
            ]}
        }"#;
        let results = SparqlResults::from_json(json).unwrap();
        assert_eq!(results.vars, vec!["s", "name"]);
        assert_eq!(results.len(), 2);
        assert_eq!(results.rows[0]["name"].lang.as_deref(), Some("fr"));
        assert!(results.rows[1].get("name").is_none());
        assert_eq!(results.column("name").collect::<Vec<_>>(), vec!["Chez Paul"]);
    }

    #[test]
    fn parses_ask_results() {
        let results = SparqlResults::from_json(r#"{"head": {}, "boolean": true}"#).unwrap();
        assert_eq!(results.boolean, Some(true));
        assert!(results.is_empty());
    }

    #[test]
    fn embedded_kind_opens_in_memory_store() {
        let config = StoreConfig {
            kind: StoreKind::Embedded,
            ..StoreConfig::default()
        };
        let store = open_store(&config).unwrap();
        store
            .upload("<http://example.org/a> <http://example.org/b> \"c\" .", None)
            .unwrap();
        assert_eq!(store.query("SELECT * WHERE { ?s ?p ?o }").unwrap().len(), 1);
    }
}
