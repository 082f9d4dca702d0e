//! HTTP client for a SPARQL 1.1 / Graph Store Protocol server.

use super::{SparqlResults, StoreResult, TripleStore};
use crate::config::StoreConfig;
use crate::error::TripleStoreError;
use crate::fetch::preview;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const SPARQL_UPDATE: &str = "application/sparql-update";
const TURTLE: &str = "text/turtle";

/// Remote triple store reached through `{base}/{dataset}/query|update|data`.
pub struct RemoteTripleStore {
    query_endpoint: String,
    update_endpoint: String,
    data_endpoint: String,
    http: ureq::Agent,
}

impl RemoteTripleStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            query_endpoint: config.query_endpoint(),
            update_endpoint: config.update_endpoint(),
            data_endpoint: config.data_endpoint(),
            http: ureq::AgentBuilder::new().build(),
        }
    }

    /// Graph-store request for `graph`, or for the default graph.
    fn graph_request(&self, method: &str, graph: Option<&str>) -> ureq::Request {
        match graph {
            Some(graph) => self
                .http
                .request(method, &self.data_endpoint)
                .query("graph", graph),
            None => self
                .http
                .request(method, &format!("{}?default", self.data_endpoint)),
        }
    }

    fn graph_endpoint(&self, graph: Option<&str>) -> String {
        match graph {
            Some(graph) => format!("{}?graph={graph}", self.data_endpoint),
            None => format!("{}?default", self.data_endpoint),
        }
    }
}

/// Map a failed call for `endpoint` to `Transport`, or to whatever `status`
/// builds for an HTTP error status.
fn call_error(
    endpoint: &str,
    err: ureq::Error,
    status: impl FnOnce(u16, String) -> TripleStoreError,
) -> TripleStoreError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            status(code, preview(&body))
        }
        ureq::Error::Transport(transport) => TripleStoreError::Transport {
            endpoint: endpoint.to_string(),
            message: transport.to_string(),
        },
    }
}

impl TripleStore for RemoteTripleStore {
    fn query(&self, sparql: &str) -> StoreResult<SparqlResults> {
        let endpoint = &self.query_endpoint;
        tracing::debug!(endpoint = %endpoint, "SPARQL query");
        let response = self
            .http
            .post(endpoint)
            .set("Accept", SPARQL_RESULTS_JSON)
            .send_form(&[("query", sparql)])
            .map_err(|e| {
                call_error(endpoint, e, |status, body| TripleStoreError::RemoteQuery {
                    endpoint: endpoint.clone(),
                    status,
                    body,
                })
            })?;

        let text = response
            .into_string()
            .map_err(|e| TripleStoreError::Response {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;
        SparqlResults::from_json(&text).map_err(|e| TripleStoreError::Response {
            endpoint: endpoint.clone(),
            message: format!("invalid SPARQL JSON results: {e}"),
        })
    }

    fn update(&self, sparql_update: &str) -> StoreResult<()> {
        let endpoint = &self.update_endpoint;
        tracing::debug!(endpoint = %endpoint, "SPARQL update");
        self.http
            .post(endpoint)
            .set("Content-Type", SPARQL_UPDATE)
            .send_string(sparql_update)
            .map_err(|e| {
                call_error(endpoint, e, |status, body| TripleStoreError::RemoteQuery {
                    endpoint: endpoint.clone(),
                    status,
                    body,
                })
            })?;
        Ok(())
    }

    fn upload(&self, turtle: &str, graph: Option<&str>) -> StoreResult<()> {
        let endpoint = self.graph_endpoint(graph);
        tracing::debug!(endpoint = %endpoint, bytes = turtle.len(), "graph store POST");
        let response = self
            .graph_request("POST", graph)
            .set("Content-Type", TURTLE)
            .send_string(turtle)
            .map_err(|e| {
                call_error(&endpoint, e, |status, body| TripleStoreError::RemoteWrite {
                    endpoint: endpoint.clone(),
                    status,
                    body,
                })
            })?;

        match response.status() {
            200 | 201 => Ok(()),
            status => Err(TripleStoreError::RemoteWrite {
                endpoint,
                status,
                body: preview(&response.into_string().unwrap_or_default()),
            }),
        }
    }

    fn delete(&self, graph: Option<&str>) -> StoreResult<()> {
        let endpoint = self.graph_endpoint(graph);
        tracing::debug!(endpoint = %endpoint, "graph store DELETE");
        self.graph_request("DELETE", graph).call().map_err(|e| {
            call_error(&endpoint, e, |status, body| TripleStoreError::RemoteWrite {
                endpoint: endpoint.clone(),
                status,
                body,
            })
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serve one canned HTTP response; the received request line is sent back
    /// through the returned channel.
    fn one_shot_server(status_line: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            tx.send(request_line.trim_end().to_string()).unwrap();
        });
        (base_url, rx)
    }

    fn store_at(base_url: String) -> RemoteTripleStore {
        RemoteTripleStore::new(&StoreConfig {
            base_url,
            ..StoreConfig::default()
        })
    }

    #[test]
    fn query_parses_json_results() {
        let body = r#"{"head":{"vars":["s"]},"results":{"bindings":[{"s":{"type":"uri","value":"http://example.org/r1"}}]}}"#;
        let (base, rx) = one_shot_server("200 OK", body);
        let results = store_at(base).query("SELECT ?s WHERE { ?s ?p ?o }").unwrap();
        assert_eq!(results.column("s").collect::<Vec<_>>(), vec!["http://example.org/r1"]);
        assert_eq!(rx.recv().unwrap(), "POST /webproject/query HTTP/1.1");
    }

    #[test]
    fn server_error_is_remote_query_with_status() {
        let (base, _rx) = one_shot_server("500 Internal Server Error", "boom");
        let err = store_at(base).query("SELECT * WHERE { ?s ?p ?o }").unwrap_err();
        match err {
            TripleStoreError::RemoteQuery { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected RemoteQuery, got {other:?}"),
        }
    }

    #[test]
    fn upload_targets_named_graph() {
        let (base, rx) = one_shot_server("201 Created", "");
        store_at(base)
            .upload("<http://a> <http://b> <http://c> .", Some("http://localhost/g"))
            .unwrap();
        assert_eq!(
            rx.recv().unwrap(),
            "POST /webproject/data?graph=http%3A%2F%2Flocalhost%2Fg HTTP/1.1"
        );
    }

    #[test]
    fn upload_with_unexpected_success_status_is_remote_write() {
        let (base, _rx) = one_shot_server("204 No Content", "");
        let err = store_at(base)
            .upload("<http://a> <http://b> <http://c> .", None)
            .unwrap_err();
        assert!(matches!(err, TripleStoreError::RemoteWrite { status: 204, .. }));
    }

    #[test]
    fn delete_failure_is_remote_write() {
        let (base, rx) = one_shot_server("404 Not Found", "no such graph");
        let err = store_at(base).delete(Some("http://localhost/g")).unwrap_err();
        assert!(matches!(err, TripleStoreError::RemoteWrite { status: 404, .. }));
        assert!(rx.recv().unwrap().starts_with("DELETE /webproject/data?graph="));
    }

    #[test]
    fn unreachable_server_is_transport_error() {
        let store = store_at("http://127.0.0.1:9".into());
        assert!(matches!(
            store.update("CLEAR DEFAULT"),
            Err(TripleStoreError::Transport { .. })
        ));
    }
}
