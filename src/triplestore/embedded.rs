//! Local triple store backed by oxigraph.

use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{GraphNameRef, NamedNode, Term};
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;

use super::{Binding, RdfValue, SparqlResults, StoreResult, TripleStore};
use crate::error::TripleStoreError;

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// In-process SPARQL store.
///
/// Unless a query names its own dataset with `FROM`, its default graph is
/// the union of every graph in the store, so data uploaded to a named graph
/// is visible to the named queries.
pub struct EmbeddedTripleStore {
    store: Store,
}

impl EmbeddedTripleStore {
    /// Create a new in-memory store (no persistence).
    pub fn in_memory() -> StoreResult<Self> {
        let store = Store::new().map_err(|e| TripleStoreError::Embedded {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Open or create a persistent store at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| TripleStoreError::Embedded {
            message: format!("failed to create oxigraph directory: {e}"),
        })?;
        let store = Store::open(path).map_err(|e| TripleStoreError::Embedded {
            message: format!("failed to open oxigraph store at {}: {e}", path.display()),
        })?;
        Ok(Self { store })
    }

    /// Number of quads across all graphs.
    pub fn len(&self) -> StoreResult<usize> {
        self.store.len().map_err(|e| TripleStoreError::Embedded {
            message: format!("failed to count quads: {e}"),
        })
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn graph_node(graph: &str) -> StoreResult<NamedNode> {
    NamedNode::new(graph).map_err(|e| TripleStoreError::Embedded {
        message: format!("invalid graph IRI <{graph}>: {e}"),
    })
}

fn to_rdf_value(term: &Term) -> RdfValue {
    match term {
        Term::NamedNode(node) => RdfValue::uri(node.as_str()),
        Term::BlankNode(node) => RdfValue {
            kind: "bnode".into(),
            value: node.as_str().to_string(),
            datatype: None,
            lang: None,
        },
        Term::Literal(literal) => {
            let lang = literal.language().map(str::to_string);
            let datatype = (lang.is_none() && literal.datatype().as_str() != XSD_STRING)
                .then(|| literal.datatype().as_str().to_string());
            RdfValue {
                kind: "literal".into(),
                value: literal.value().to_string(),
                datatype,
                lang,
            }
        }
        #[allow(unreachable_patterns)]
        other => RdfValue {
            kind: "triple".into(),
            value: other.to_string(),
            datatype: None,
            lang: None,
        },
    }
}

impl TripleStore for EmbeddedTripleStore {
    fn query(&self, sparql: &str) -> StoreResult<SparqlResults> {
        let mut prepared = SparqlEvaluator::new()
            .parse_query(sparql)
            .map_err(|e| TripleStoreError::Embedded {
                message: format!("invalid SPARQL query: {e}"),
            })?;
        if prepared.dataset().is_default_dataset() {
            prepared.dataset_mut().set_default_graph_as_union();
        }
        let results = prepared
            .on_store(&self.store)
            .execute()
            .map_err(|e| TripleStoreError::Embedded {
                message: format!("SPARQL query failed: {e}"),
            })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let vars = solutions
                    .variables()
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| TripleStoreError::Embedded {
                        message: format!("solution error: {e}"),
                    })?;
                    let row: Binding = solution
                        .iter()
                        .map(|(var, term)| (var.as_str().to_string(), to_rdf_value(term)))
                        .collect();
                    rows.push(row);
                }
                Ok(SparqlResults {
                    vars,
                    rows,
                    boolean: None,
                })
            }
            QueryResults::Boolean(value) => Ok(SparqlResults {
                boolean: Some(value),
                ..Default::default()
            }),
            QueryResults::Graph(_) => Err(TripleStoreError::Embedded {
                message: "CONSTRUCT and DESCRIBE results are not supported".into(),
            }),
        }
    }

    fn update(&self, sparql_update: &str) -> StoreResult<()> {
        self.store
            .update(sparql_update)
            .map_err(|e| TripleStoreError::Embedded {
                message: format!("SPARQL update failed: {e}"),
            })
    }

    fn upload(&self, turtle: &str, graph: Option<&str>) -> StoreResult<()> {
        let mut parser = RdfParser::from_format(RdfFormat::Turtle);
        if let Some(graph) = graph {
            parser = parser.with_default_graph(graph_node(graph)?);
        }
        self.store
            .load_from_reader(parser, turtle.as_bytes())
            .map_err(|e| TripleStoreError::Embedded {
                message: format!("failed to load Turtle: {e}"),
            })?;
        tracing::debug!(graph = graph.unwrap_or("default"), "loaded Turtle into embedded store");
        Ok(())
    }

    fn delete(&self, graph: Option<&str>) -> StoreResult<()> {
        let result = match graph {
            Some(graph) => {
                let node = graph_node(graph)?;
                self.store.clear_graph(node.as_ref())
            }
            None => self.store.clear_graph(GraphNameRef::DefaultGraph),
        };
        result.map_err(|e| TripleStoreError::Embedded {
            message: format!("failed to clear graph: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"
        @prefix schema: <http://schema.org/> .
        <https://lyon.coopcycle.org/api/restaurants/42> a schema:Restaurant ;
            schema:name "Chez Paul" .
    "#;
    const GRAPH: &str = "http://localhost/graphs/restaurants";

    #[test]
    fn upload_then_query_finds_subject() {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        store.upload(DATA, None).unwrap();

        let results = store
            .query("SELECT ?s WHERE { ?s a <http://schema.org/Restaurant> }")
            .unwrap();
        assert_eq!(
            results.column("s").collect::<Vec<_>>(),
            vec!["https://lyon.coopcycle.org/api/restaurants/42"]
        );
    }

    #[test]
    fn delete_named_graph_then_query_is_empty() {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        store.upload(DATA, Some(GRAPH)).unwrap();
        let in_graph = format!("SELECT ?s WHERE {{ GRAPH <{GRAPH}> {{ ?s ?p ?o }} }}");
        assert_eq!(store.query(&in_graph).unwrap().len(), 2);

        store.delete(Some(GRAPH)).unwrap();
        assert_eq!(store.query(&in_graph).unwrap().len(), 0);
    }

    #[test]
    fn named_graph_data_is_visible_to_plain_queries() {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        store.upload(DATA, Some(GRAPH)).unwrap();

        let results = store
            .query("SELECT ?s WHERE { ?s a <http://schema.org/Restaurant> }")
            .unwrap();
        assert_eq!(
            results.column("s").collect::<Vec<_>>(),
            vec!["https://lyon.coopcycle.org/api/restaurants/42"]
        );
    }

    #[test]
    fn from_clause_keeps_its_own_dataset() {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        store.upload(DATA, Some(GRAPH)).unwrap();
        let results = store
            .query("SELECT ?s FROM <http://localhost/graphs/other> WHERE { ?s ?p ?o }")
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn delete_default_graph() {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        store.upload(DATA, None).unwrap();
        store.delete(None).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn update_and_ask() {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        store
            .update("INSERT DATA { <http://example.org/a> <http://example.org/b> 1.5 }")
            .unwrap();
        let ask = store
            .query("ASK { <http://example.org/a> <http://example.org/b> ?o }")
            .unwrap();
        assert_eq!(ask.boolean, Some(true));

        let rows = store.query("SELECT ?o WHERE { ?s ?p ?o }").unwrap();
        assert_eq!(
            rows.rows[0]["o"].datatype.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#decimal")
        );
    }

    #[test]
    fn plain_strings_carry_no_datatype() {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        store.upload(DATA, None).unwrap();
        let rows = store
            .query("SELECT ?name WHERE { ?s <http://schema.org/name> ?name }")
            .unwrap();
        assert_eq!(rows.rows[0]["name"], RdfValue::literal("Chez Paul"));
    }

    #[test]
    fn invalid_query_is_an_embedded_error() {
        let store = EmbeddedTripleStore::in_memory().unwrap();
        assert!(matches!(
            store.query("SELEKT nothing"),
            Err(TripleStoreError::Embedded { .. })
        ));
    }

    #[test]
    fn persistent_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = EmbeddedTripleStore::open(dir.path()).unwrap();
            store.upload(DATA, None).unwrap();
        }
        let store = EmbeddedTripleStore::open(dir.path()).unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }
}
