//! File-backed document store.
//!
//! Each collection lives in `<root>/<database>/<collection>.json` as a JSON
//! array of documents. Collections are read into memory on connect and
//! written back after every mutation and on disconnect. Writes go to a
//! temporary file that is renamed over the original.

use super::memory::{MemoryClient, MemoryCollection};
use super::{Document, DocumentClient, DocumentCollection, DocumentStream};
use crate::policy::Selector;
use crate::{Error, Result};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde_json::Value;
use tracing::{debug, warn};

const EXTENSION: &str = "json";

/// Document store persisted as JSON files under a data directory.
#[derive(Clone)]
pub struct FileClient {
    root: PathBuf,
    inner: MemoryClient,
}

impl FileClient {
    /// Create a disconnected client rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inner: MemoryClient::new(),
        }
    }

    /// Data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, database: &str, name: &str) -> PathBuf {
        self.root.join(database).join(format!("{}.{}", name, EXTENSION))
    }

    async fn load_all(&self) -> Result<()> {
        let mut databases = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(database) = databases.next_entry().await? {
            if !database.file_type().await?.is_dir() {
                continue;
            }
            let database_name = database.file_name().to_string_lossy().to_string();

            let mut files = tokio::fs::read_dir(database.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };

                let content = tokio::fs::read_to_string(&path).await?;
                let values: Vec<Value> = serde_json::from_str(&content)?;
                let total = values.len();
                let docs: Vec<Document> = values
                    .into_iter()
                    .filter_map(|value| match value {
                        Value::Object(doc) => Some(doc),
                        _ => None,
                    })
                    .collect();
                if docs.len() < total {
                    // Not representable as documents; gone after the next write.
                    warn!(
                        path = %path.display(),
                        dropped = total - docs.len(),
                        "skipping stored entries that are not documents"
                    );
                }
                debug!(path = %path.display(), documents = docs.len(), "loaded collection");
                self.inner.collection_handle(&database_name, name).replace(docs);
            }
        }

        Ok(())
    }

    async fn flush_all(&self) -> Result<()> {
        for (database, name) in self.inner.collection_names() {
            let handle = self.inner.collection_handle(&database, &name);
            write_collection(&self.path_of(&database, &name), &handle).await?;
        }
        Ok(())
    }
}

async fn write_collection(path: &Path, collection: &MemoryCollection) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_vec_pretty(&collection.snapshot())?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl DocumentClient for FileClient {
    async fn connect(&self) -> Result<()> {
        self.inner.connect().await?;
        if let Err(e) = self.load_all().await {
            self.inner.disconnect().await?;
            return Err(Error::connection(format!(
                "failed to open data directory {}: {}",
                self.root.display(),
                e
            )));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let flushed = self.flush_all().await;
        self.inner.disconnect().await?;
        flushed
    }

    fn collection(&self, database: &str, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(FileCollection {
            path: self.path_of(database, name),
            inner: self.inner.collection_handle(database, name),
        })
    }
}

struct FileCollection {
    path: PathBuf,
    inner: Arc<MemoryCollection>,
}

impl FileCollection {
    async fn persist(&self) -> Result<()> {
        write_collection(&self.path, &self.inner).await
    }
}

#[async_trait]
impl DocumentCollection for FileCollection {
    async fn find(&self, selector: &Selector) -> Result<DocumentStream> {
        self.inner.find(selector).await
    }

    async fn insert_one(&self, doc: Document) -> Result<()> {
        self.inner.insert_one(doc).await?;
        self.persist().await
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<usize> {
        let count = self.inner.insert_many(docs).await?;
        self.persist().await?;
        Ok(count)
    }

    async fn delete_one(&self, selector: &Selector) -> Result<u64> {
        let deleted = self.inner.delete_one(selector).await?;
        if deleted > 0 {
            self.persist().await?;
        }
        Ok(deleted)
    }

    async fn delete_many(&self, selector: &Selector) -> Result<u64> {
        let deleted = self.inner.delete_many(selector).await?;
        if deleted > 0 {
            self.persist().await?;
        }
        Ok(deleted)
    }

    async fn drop_collection(&self) -> Result<()> {
        self.inner.drop_collection().await?;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::encode_rule;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_documents_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();

        let client = FileClient::new(dir.path());
        client.connect().await.unwrap();
        let collection = client.collection("casbin", "casbin_rule");
        collection
            .insert_one(encode_rule("p", &["alice", "data1", "read"]).unwrap().to_document())
            .await
            .unwrap();
        client.disconnect().await.unwrap();

        assert!(dir.path().join("casbin").join("casbin_rule.json").exists());

        let reopened = FileClient::new(dir.path());
        reopened.connect().await.unwrap();
        let docs: Vec<Document> = reopened
            .collection("casbin", "casbin_rule")
            .find(&Selector::new())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["v0"], "alice");
    }

    #[tokio::test]
    async fn test_connect_to_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let client = FileClient::new(dir.path().join("not-created-yet"));
        client.connect().await.unwrap();

        let collection = client.collection("casbin", "casbin_rule");
        collection.drop_collection().await.unwrap();
        collection
            .insert_one(encode_rule("g", &["alice", "admin"]).unwrap().to_document())
            .await
            .unwrap();
        assert!(client.root().join("casbin").join("casbin_rule.json").exists());
    }

    #[tokio::test]
    async fn test_connect_skips_entries_that_are_not_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("casbin")).unwrap();
        std::fs::write(
            dir.path().join("casbin").join("casbin_rule.json"),
            r#"[{"ptype": "p", "v0": "alice"}, 42, "p, bob", {"ptype": "g", "v0": "alice", "v1": "admin"}]"#,
        )
        .unwrap();

        let client = FileClient::new(dir.path());
        client.connect().await.unwrap();

        let docs: Vec<Document> = client
            .collection("casbin", "casbin_rule")
            .find(&Selector::new())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["ptype"], "g");
    }

    #[tokio::test]
    async fn test_connect_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("casbin")).unwrap();
        std::fs::write(dir.path().join("casbin").join("casbin_rule.json"), "{not json").unwrap();

        let err = FileClient::new(dir.path()).connect().await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }
}
