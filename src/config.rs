//! Application configuration, persisted as TOML.
//!
//! Resolution order: built-in defaults, then the config file (explicit
//! `--config` or `$XDG_CONFIG_HOME/coopcycle-ld/config.toml` when present),
//! then `COOPCYCLE_STORE_URL` / `COOPCYCLE_DATA_DIR`, then CLI flags applied by
//! the binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::paths::AppPaths;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Environment variable overriding `store.base_url`.
pub const ENV_STORE_URL: &str = "COOPCYCLE_STORE_URL";
/// Environment variable overriding `scrape.data_dir`.
pub const ENV_DATA_DIR: &str = "COOPCYCLE_DATA_DIR";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

/// Which triple store backend the CLI talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// A SPARQL 1.1 server reached over HTTP (Apache Jena Fuseki layout).
    #[default]
    Remote,
    /// An oxigraph store embedded in the process.
    Embedded,
}

/// Triple store endpoint settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    /// Server root, e.g. `http://localhost:3030`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Dataset name under the server root.
    #[serde(default = "default_dataset")]
    pub dataset: String,
    /// On-disk location of the embedded store; in-memory when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:3030".into()
}
fn default_dataset() -> String {
    "webproject".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            base_url: default_base_url(),
            dataset: default_dataset(),
            path: None,
        }
    }
}

impl StoreConfig {
    fn dataset_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.dataset)
    }

    /// SPARQL 1.1 query endpoint.
    pub fn query_endpoint(&self) -> String {
        format!("{}/query", self.dataset_url())
    }

    /// SPARQL 1.1 update endpoint.
    pub fn update_endpoint(&self) -> String {
        format!("{}/update", self.dataset_url())
    }

    /// Graph Store Protocol endpoint.
    pub fn data_endpoint(&self) -> String {
        format!("{}/data", self.dataset_url())
    }
}

/// Scrape phase settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScrapeConfig {
    /// Upstream directory feed listing every federation member.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,
    /// Domain shared by every service host.
    #[serde(default = "default_federation_domain")]
    pub federation_domain: String,
    /// Path of the shop listing page on a service host.
    #[serde(default = "default_shops_path")]
    pub shops_path: String,
    /// Href prefix identifying restaurant pages on the listing.
    #[serde(default = "default_restaurant_prefix")]
    pub restaurant_prefix: String,
    /// Root of the file-based document store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Restaurants fetched concurrently per service.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_catalog_url() -> String {
    "https://coopcycle.org/coopcycle.json".into()
}
fn default_federation_domain() -> String {
    "coopcycle.org".into()
}
fn default_shops_path() -> String {
    "/en/shops".into()
}
fn default_restaurant_prefix() -> String {
    "/en/restaurant/".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_jobs() -> usize {
    1
}
fn default_user_agent() -> String {
    concat!("coopcycle-ld/", env!("CARGO_PKG_VERSION")).into()
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            federation_domain: default_federation_domain(),
            shops_path: default_shops_path(),
            restaurant_prefix: default_restaurant_prefix(),
            data_dir: default_data_dir(),
            jobs: default_jobs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Preference collector settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PreferencesConfig {
    /// Local Turtle copy of the collected graph.
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    /// Base IRI every preference node is a fragment of.
    #[serde(default = "default_base_iri")]
    pub base_iri: String,
    /// Target graph; the store's default graph when unset.
    #[serde(default)]
    pub graph_uri: Option<String>,
}

fn default_output_file() -> PathBuf {
    PathBuf::from("user_preferences.ttl")
}
fn default_base_iri() -> String {
    "http://localhost/preferences".into()
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            base_iri: default_base_iri(),
            graph_uri: None,
        }
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist; the XDG default is used only if present.
    pub fn resolve(explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match AppPaths::resolve().map(|p| p.config_file()) {
                Some(path) if path.is_file() => Self::load(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_STORE_URL).filter(|v| !v.is_empty()) {
            self.store.base_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.scrape.data_dir = PathBuf::from(dir);
        }
    }

    /// Reject values that would only fail later, deep inside a run.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scrape.jobs == 0 {
            return Err(ConfigError::Invalid {
                field: "scrape.jobs".into(),
                message: "must be at least 1".into(),
            });
        }
        if !self.store.base_url.starts_with("http://") && !self.store.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                field: "store.base_url".into(),
                message: format!("\"{}\" must start with http:// or https://", self.store.base_url),
            });
        }
        if !self.scrape.restaurant_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "scrape.restaurant_prefix".into(),
                message: "must be an absolute path starting with '/'".into(),
            });
        }
        Ok(())
    }
}
