//! Document store contract consumed by the adapter.
//!
//! The adapter only needs a handful of collection operations: find by
//! selector, insert, delete and drop. Any document database can back the
//! adapter by implementing [`DocumentClient`] and [`DocumentCollection`].
//! Two implementations ship with the crate:
//!
//! - [`MemoryClient`]: process-local collections, no durability
//! - [`FileClient`]: one JSON file per collection under a data directory
//!
//! [`StoreUrl`] picks one of them from a `memory://` or `file://<dir>` URL.

mod file;
mod memory;

pub use file::FileClient;
pub use memory::{MemoryClient, MemoryCollection};

use crate::policy::Selector;
use crate::{Error, Result};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A stored document: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Lazy sequence of documents returned by a find. Dropping it closes it.
pub type DocumentStream = BoxStream<'static, Result<Document>>;

/// Key under which stores keep a document's identifier.
pub const ID_KEY: &str = "_id";

const MEMORY_SCHEME: &str = "memory";
const FILE_SCHEME: &str = "file";

/// Location of one of the bundled stores, parsed from a store URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUrl {
    /// `memory://`: a fresh [`MemoryClient`].
    Memory,
    /// `file://<dir>`: a [`FileClient`] rooted at `<dir>`.
    File(PathBuf),
}

impl StoreUrl {
    /// Parse a store URL.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| Error::config_key(format!("store url {:?} has no scheme", url), "url"))?;

        match scheme {
            MEMORY_SCHEME if rest.is_empty() => Ok(Self::Memory),
            MEMORY_SCHEME => Err(Error::config_key(
                format!("memory store url takes no path, got {:?}", url),
                "url",
            )),
            FILE_SCHEME if rest.is_empty() => Err(Error::config_key(
                "file store url needs a data directory",
                "url",
            )),
            FILE_SCHEME => Ok(Self::File(PathBuf::from(rest))),
            other => Err(Error::config_key(
                format!("unsupported store scheme {:?}", other),
                "url",
            )),
        }
    }

    /// Build a disconnected client for this location.
    pub fn client(&self) -> Arc<dyn DocumentClient> {
        match self {
            Self::Memory => Arc::new(MemoryClient::new()),
            Self::File(root) => Arc::new(FileClient::new(root)),
        }
    }
}

impl fmt::Display for StoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "{}://", MEMORY_SCHEME),
            Self::File(root) => write!(f, "{}://{}", FILE_SCHEME, root.display()),
        }
    }
}

/// Connection to a document store.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Open the connection.
    async fn connect(&self) -> Result<()>;

    /// Close the connection.
    async fn disconnect(&self) -> Result<()>;

    /// Handle on a collection. Does not touch the store.
    fn collection(&self, database: &str, name: &str) -> Arc<dyn DocumentCollection>;
}

/// Operations on one collection of documents.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Stream every document matching `selector`.
    async fn find(&self, selector: &Selector) -> Result<DocumentStream>;

    /// Insert one document.
    async fn insert_one(&self, doc: Document) -> Result<()>;

    /// Insert documents in order. Returns how many were inserted.
    async fn insert_many(&self, docs: Vec<Document>) -> Result<usize>;

    /// Delete the first document matching `selector`. Returns 0 or 1.
    async fn delete_one(&self, selector: &Selector) -> Result<u64>;

    /// Delete every document matching `selector`.
    async fn delete_many(&self, selector: &Selector) -> Result<u64>;

    /// Remove the collection and all of its documents.
    async fn drop_collection(&self) -> Result<()>;
}
