//! JSON-LD document repository.
//!
//! Documents are addressed by [`DocumentKey`], which maps onto the on-disk
//! layout under the data directory:
//!
//! ```text
//! coopcycle.json
//! jsonld/service/{i}-{service}.json
//! jsonld/restaurant/{i}-{service}/{id}-{slug}.json
//! jsonld/offer/{i}-{service}/{id}-{slug}.json
//! ```
//!
//! Keys are collision-free (service index + restaurant id), so concurrent
//! writers never touch the same file.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde_json::Value;

use crate::error::DocStoreError;

pub type DocStoreResult<T> = std::result::Result<T, DocStoreError>;

/// Address of one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    /// The raw upstream feed.
    Catalog,
    Service {
        index: usize,
        service: String,
    },
    Restaurant {
        index: usize,
        service: String,
        restaurant: String,
    },
    Offer {
        index: usize,
        service: String,
        restaurant: String,
    },
}

impl DocumentKey {
    /// Path relative to the store root.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            DocumentKey::Catalog => PathBuf::from("coopcycle.json"),
            DocumentKey::Service { index, service } => Path::new("jsonld")
                .join("service")
                .join(format!("{index}-{service}.json")),
            DocumentKey::Restaurant {
                index,
                service,
                restaurant,
            } => Path::new("jsonld")
                .join("restaurant")
                .join(format!("{index}-{service}"))
                .join(format!("{restaurant}.json")),
            DocumentKey::Offer {
                index,
                service,
                restaurant,
            } => Path::new("jsonld")
                .join("offer")
                .join(format!("{index}-{service}"))
                .join(format!("{restaurant}.json")),
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.relative_path().display())
    }
}

/// Keyed storage for JSON-LD documents.
pub trait DocumentStore: Send + Sync {
    /// Store `document` under `key`, replacing any previous version.
    fn put(&self, key: &DocumentKey, document: &Value) -> DocStoreResult<()>;

    /// Fetch the document under `key`, `None` if never stored.
    fn get(&self, key: &DocumentKey) -> DocStoreResult<Option<Value>>;
}

/// Filesystem-backed store rooted at the data directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute location of `key`.
    pub fn path_of(&self, key: &DocumentKey) -> PathBuf {
        self.root.join(key.relative_path())
    }
}

impl DocumentStore for FsDocumentStore {
    fn put(&self, key: &DocumentKey, document: &Value) -> DocStoreResult<()> {
        let path = self.path_of(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocStoreError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(document).map_err(|e| DocStoreError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| DocStoreError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn get(&self, key: &DocumentKey) -> DocStoreResult<Option<Value>> {
        let path = self.path_of(key);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DocStoreError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| DocStoreError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}

/// In-memory store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<DocumentKey, Value>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All keys, sorted by their relative path.
    pub fn keys(&self) -> Vec<DocumentKey> {
        let mut keys: Vec<DocumentKey> = self.documents.iter().map(|e| e.key().clone()).collect();
        keys.sort_by_key(DocumentKey::relative_path);
        keys
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn put(&self, key: &DocumentKey, document: &Value) -> DocStoreResult<()> {
        self.documents.insert(key.clone(), document.clone());
        Ok(())
    }

    fn get(&self, key: &DocumentKey) -> DocStoreResult<Option<Value>> {
        Ok(self.documents.get(key).map(|doc| doc.value().clone()))
    }
}
