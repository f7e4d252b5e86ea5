//! In-memory document store.

use super::{Document, DocumentClient, DocumentCollection, DocumentStream, ID_KEY};
use crate::policy::Selector;
use crate::{Error, Result};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-local document store.
///
/// Cloning the client shares its collections and connection state.
/// Collection operations fail while the client is disconnected.
#[derive(Clone, Default)]
pub struct MemoryClient {
    collections: Arc<RwLock<HashMap<(String, String), Arc<MemoryCollection>>>>,
    connected: Arc<AtomicBool>,
}

impl MemoryClient {
    /// Create a disconnected client with no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the client is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Concrete handle on a collection, created on first use.
    pub fn collection_handle(&self, database: &str, name: &str) -> Arc<MemoryCollection> {
        let key = (database.to_string(), name.to_string());
        if let Some(collection) = self.collections.read().get(&key) {
            return collection.clone();
        }

        self.collections
            .write()
            .entry(key)
            .or_insert_with(|| {
                Arc::new(MemoryCollection {
                    docs: RwLock::new(Vec::new()),
                    connected: self.connected.clone(),
                })
            })
            .clone()
    }

    /// Every `(database, collection)` pair created so far.
    pub fn collection_names(&self) -> Vec<(String, String)> {
        let mut names: Vec<_> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl DocumentClient for MemoryClient {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn collection(&self, database: &str, name: &str) -> Arc<dyn DocumentCollection> {
        self.collection_handle(database, name)
    }
}

/// One in-memory collection, kept in insertion order.
pub struct MemoryCollection {
    docs: RwLock<Vec<Document>>,
    connected: Arc<AtomicBool>,
}

impl MemoryCollection {
    /// Copy of every stored document.
    pub fn snapshot(&self) -> Vec<Document> {
        self.docs.read().clone()
    }

    /// Replace the stored documents wholesale.
    pub fn replace(&self, docs: Vec<Document>) {
        *self.docs.write() = docs;
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Whether the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::connection("client is not connected"))
        }
    }
}

fn with_id(mut doc: Document) -> Document {
    if !doc.contains_key(ID_KEY) {
        doc.insert(
            ID_KEY.to_string(),
            Value::String(uuid::Uuid::new_v4().simple().to_string()),
        );
    }
    doc
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find(&self, selector: &Selector) -> Result<DocumentStream> {
        self.ensure_connected()?;
        let matching: Vec<Document> = self
            .docs
            .read()
            .iter()
            .filter(|doc| selector.matches(doc))
            .cloned()
            .collect();
        Ok(stream::iter(matching.into_iter().map(Ok)).boxed())
    }

    async fn insert_one(&self, doc: Document) -> Result<()> {
        self.ensure_connected()?;
        self.docs.write().push(with_id(doc));
        Ok(())
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<usize> {
        self.ensure_connected()?;
        let count = docs.len();
        self.docs.write().extend(docs.into_iter().map(with_id));
        Ok(count)
    }

    async fn delete_one(&self, selector: &Selector) -> Result<u64> {
        self.ensure_connected()?;
        let mut docs = self.docs.write();
        match docs.iter().position(|doc| selector.matches(doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, selector: &Selector) -> Result<u64> {
        self.ensure_connected()?;
        let mut docs = self.docs.write();
        let before = docs.len();
        docs.retain(|doc| !selector.matches(doc));
        Ok((before - docs.len()) as u64)
    }

    async fn drop_collection(&self) -> Result<()> {
        self.ensure_connected()?;
        self.docs.write().clear();
        Ok(())
    }
}
