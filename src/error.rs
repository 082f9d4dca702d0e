//! Rich diagnostic error types for coopcycle-ld.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so a failed scrape, conversion or query
//! tells the user what to check next.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for coopcycle-ld.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the CLI boundary.
#[derive(Debug, Error, Diagnostic)]
pub enum AppError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    DocStore(#[from] DocStoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Shacl(#[from] ShaclError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TripleStore(#[from] TripleStoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Preference(#[from] PreferenceError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(coopcycle::config::read),
        help("Check that the file exists and is readable, or drop --config to use defaults.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    #[diagnostic(
        code(coopcycle::config::parse),
        help("The config file must be valid TOML with [store], [scrape] and [preferences] tables.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration value for `{field}`: {message}")]
    #[diagnostic(code(coopcycle::config::invalid))]
    Invalid { field: String, message: String },
}

// ---------------------------------------------------------------------------
// HTTP fetch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("transport error fetching \"{url}\": {message}")]
    #[diagnostic(
        code(coopcycle::fetch::transport),
        help("The request never got an HTTP answer. Check DNS, connectivity and the URL.")
    )]
    Transport { url: String, message: String },

    #[error("HTTP {status} fetching \"{url}\"")]
    #[diagnostic(
        code(coopcycle::fetch::status),
        help("The server answered with an error status. The page may have moved or be down.")
    )]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to read body of \"{url}\": {message}")]
    #[diagnostic(code(coopcycle::fetch::body))]
    Body { url: String, message: String },
}

// ---------------------------------------------------------------------------
// Scrape errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ScrapeError {
    #[error("service catalog is not a JSON array of services: {message}")]
    #[diagnostic(
        code(coopcycle::scrape::catalog),
        help(
            "The catalog feed changed shape or the download was truncated. \
             Re-run `jsonld service` to fetch a fresh copy."
        )
    )]
    Catalog { message: String },

    #[error("service catalog has not been downloaded yet")]
    #[diagnostic(
        code(coopcycle::scrape::no_catalog),
        help("Run `coopcycle-ld jsonld service` first; it saves coopcycle.json in the data directory.")
    )]
    MissingCatalog,

    #[error("invalid restaurant id pattern for domain \"{domain}\": {message}")]
    #[diagnostic(code(coopcycle::scrape::pattern))]
    Pattern { domain: String, message: String },

    #[error("failed to start the scrape worker pool: {message}")]
    #[diagnostic(code(coopcycle::scrape::pool), help("Lower `scrape.jobs` in the config."))]
    Pool { message: String },

    #[error("failed to encode {what} as JSON: {message}")]
    #[diagnostic(code(coopcycle::scrape::encode))]
    Encode { what: &'static str, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    DocStore(#[from] DocStoreError),
}

// ---------------------------------------------------------------------------
// Document store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DocStoreError {
    #[error("I/O error on {path}")]
    #[diagnostic(
        code(coopcycle::docstore::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON document {path}: {message}")]
    #[diagnostic(
        code(coopcycle::docstore::parse),
        help("The stored document is not valid JSON. Re-run the scrape phase that produced it.")
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// JSON-LD → RDF conversion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConvertError {
    #[error("I/O error on {path}")]
    #[diagnostic(code(coopcycle::convert::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not valid JSON: {message}")]
    #[diagnostic(code(coopcycle::convert::json))]
    Json { message: String },

    #[error("JSON-LD parse error: {message}")]
    #[diagnostic(
        code(coopcycle::convert::jsonld),
        help(
            "Only the schema.org context is inlined. Documents with other remote \
             contexts or invalid value objects cannot be converted."
        )
    )]
    JsonLd { message: String },

    #[error("Turtle parse error: {message}")]
    #[diagnostic(code(coopcycle::convert::turtle))]
    Turtle { message: String },

    #[error("RDF serialization error: {message}")]
    #[diagnostic(code(coopcycle::convert::serialize))]
    Serialize { message: String },

    #[error("input folder does not exist: {path}")]
    #[diagnostic(code(coopcycle::convert::no_input))]
    MissingInput { path: String },
}

// ---------------------------------------------------------------------------
// SHACL errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ShaclError {
    #[error("failed to read shapes file {path}")]
    #[diagnostic(code(coopcycle::shacl::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("shapes graph is not valid Turtle: {message}")]
    #[diagnostic(code(coopcycle::shacl::shapes))]
    Shapes { message: String },

    #[error("invalid sh:pattern \"{pattern}\": {message}")]
    #[diagnostic(code(coopcycle::shacl::pattern))]
    Pattern { pattern: String, message: String },
}

// ---------------------------------------------------------------------------
// Triple store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TripleStoreError {
    #[error("transport error talking to {endpoint}: {message}")]
    #[diagnostic(
        code(coopcycle::store::transport),
        help("Is the triple store running? Check `store.base_url` or COOPCYCLE_STORE_URL.")
    )]
    Transport { endpoint: String, message: String },

    #[error("SPARQL request to {endpoint} failed with HTTP {status}")]
    #[diagnostic(
        code(coopcycle::store::remote_query),
        help("The server rejected the query or update. The response body usually names the syntax error.")
    )]
    RemoteQuery {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("graph store write to {endpoint} failed with HTTP {status}")]
    #[diagnostic(
        code(coopcycle::store::remote_write),
        help("Check the graph URI and that the dataset accepts writes.")
    )]
    RemoteWrite {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {endpoint}: {message}")]
    #[diagnostic(code(coopcycle::store::response))]
    Response { endpoint: String, message: String },

    #[error("embedded store error: {message}")]
    #[diagnostic(
        code(coopcycle::store::embedded),
        help("The embedded oxigraph store failed. Check `store.path` and the query syntax.")
    )]
    Embedded { message: String },
}

// ---------------------------------------------------------------------------
// Query catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("invalid value for query parameter `{name}`: {message}")]
    #[diagnostic(code(coopcycle::query::param))]
    Param { name: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] TripleStoreError),
}

// ---------------------------------------------------------------------------
// Preference collector errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PreferenceError {
    #[error("failed to read answer to \"{question}\"")]
    #[diagnostic(code(coopcycle::preferences::input))]
    Input {
        question: String,
        #[source]
        source: std::io::Error,
    },

    #[error("input ended before \"{question}\" was answered")]
    #[diagnostic(code(coopcycle::preferences::eof))]
    EndOfInput { question: String },

    #[error("invalid preferences base IRI \"{iri}\": {message}")]
    #[diagnostic(
        code(coopcycle::preferences::base_iri),
        help("`preferences.base_iri` must be an absolute IRI such as http://localhost/preferences.")
    )]
    BaseIri { iri: String, message: String },

    #[error("failed to write preferences to {path}")]
    #[diagnostic(code(coopcycle::preferences::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] TripleStoreError),
}

/// Convenience alias for functions returning coopcycle-ld results.
pub type AppResult<T> = std::result::Result<T, AppError>;
