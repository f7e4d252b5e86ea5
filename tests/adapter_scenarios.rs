//! End-to-end adapter scenarios against the bundled stores.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use policy_store_adapter::store::{Document, DocumentStream};
use policy_store_adapter::{
    Adapter, AdapterConfig, DocumentClient, DocumentCollection, Error, FileClient, MemoryClient,
    PolicyModel, Result, Selector, StoreAdapter,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn sample_model() -> PolicyModel {
    let mut model = PolicyModel::new();
    model.add_rule("p", "p", strings(&["alice", "data1", "read"]));
    model.add_rule("g", "g", strings(&["alice", "admin"]));
    model
}

fn document(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[tokio::test]
async fn save_then_load_returns_the_same_rules() {
    let client = MemoryClient::new();
    let mut adapter = StoreAdapter::connect(Arc::new(client), AdapterConfig::default())
        .await
        .unwrap();

    adapter.save_policy(&sample_model()).await.unwrap();

    let mut loaded = PolicyModel::new();
    adapter.load_policy(&mut loaded).await.unwrap();

    assert_eq!(loaded.rule_count(), 2);
    assert_eq!(loaded.rules("p", "p"), &[strings(&["alice", "data1", "read"])]);
    assert_eq!(loaded.rules("g", "g"), &[strings(&["alice", "admin"])]);
    assert!(!adapter.is_filtered());

    adapter.close().await.unwrap();
}

#[tokio::test]
async fn save_replaces_previous_rules() {
    let client = MemoryClient::new();
    let mut adapter = StoreAdapter::connect(Arc::new(client.clone()), AdapterConfig::default())
        .await
        .unwrap();

    adapter
        .add_policy("p", "p", &strings(&["bob", "data2", "write"]))
        .await
        .unwrap();
    adapter.save_policy(&sample_model()).await.unwrap();

    let mut loaded = PolicyModel::new();
    adapter.load_policy(&mut loaded).await.unwrap();
    assert_eq!(loaded, sample_model());

    adapter.save_policy(&PolicyModel::new()).await.unwrap();
    assert!(client.collection_handle("casbin", "casbin_rule").is_empty());
}

#[tokio::test]
async fn filtered_load_returns_subset_and_blocks_save() {
    let client = MemoryClient::new();
    let mut adapter = StoreAdapter::connect(Arc::new(client.clone()), AdapterConfig::default())
        .await
        .unwrap();
    adapter.save_policy(&sample_model()).await.unwrap();

    let mut partial = PolicyModel::new();
    let filter = Selector::for_filtered_removal("g", 0, &["alice"]);
    adapter
        .load_filtered_policy(&mut partial, Some(&filter))
        .await
        .unwrap();

    assert!(adapter.is_filtered());
    assert_eq!(partial.rule_count(), 1);
    assert_eq!(partial.rules("g", "g"), &[strings(&["alice", "admin"])]);

    assert!(matches!(adapter.save_policy(&partial).await, Err(Error::FilteredSave)));
    assert_eq!(client.collection_handle("casbin", "casbin_rule").len(), 2);
}

#[tokio::test]
async fn malformed_records_are_skipped() {
    let client = MemoryClient::new();
    client.connect().await.unwrap();
    let collection = client.collection("casbin", "casbin_rule");
    collection
        .insert_many(vec![
            document(json!({"ptype": "p", "v0": "alice", "v1": "data1", "v2": "read"})),
            document(json!({"ptype": 7, "v0": "broken"})),
            document(json!({"ptype": "", "v0": "no section"})),
            document(json!({"ptype": "g", "v0": "alice", "v1": "admin"})),
            document(json!({"ptype": "p", "v0": "bob", "v1": "", "v2": "write"})),
        ])
        .await
        .unwrap();

    let mut adapter = StoreAdapter::from_client(&client, AdapterConfig::default()).unwrap();
    let mut model = PolicyModel::new();
    adapter.load_policy(&mut model).await.unwrap();

    assert_eq!(model.rule_count(), 3);
    // A hole after v0 truncates the rule.
    assert!(model.rules("p", "p").contains(&strings(&["bob"])));
    assert_eq!(adapter.metrics().records_skipped, 2);
}

#[tokio::test]
async fn remove_filtered_policy_with_offset_window() {
    let client = MemoryClient::new();
    let mut adapter = StoreAdapter::connect(Arc::new(client.clone()), AdapterConfig::default())
        .await
        .unwrap();

    let mut model = PolicyModel::new();
    model.add_rule("p", "p", strings(&["alice", "data1", "read"]));
    model.add_rule("p", "p", strings(&["bob", "data2", "read"]));
    model.add_rule("p", "p", strings(&["bob", "data2", "write"]));
    model.add_rule("p", "p2", strings(&["carol", "data3", "read"]));
    adapter.save_policy(&model).await.unwrap();

    adapter
        .remove_filtered_policy("p", "p", 2, &strings(&["read"]))
        .await
        .unwrap();

    let mut loaded = PolicyModel::new();
    adapter.load_policy(&mut loaded).await.unwrap();
    assert_eq!(loaded.rules("p", "p"), &[strings(&["bob", "data2", "write"])]);
    assert_eq!(loaded.rules("p", "p2").len(), 1);
}

#[tokio::test]
async fn file_store_keeps_rules_across_adapters() {
    let dir = tempfile::tempdir().unwrap();

    let mut adapter = StoreAdapter::connect(
        Arc::new(FileClient::new(dir.path())),
        AdapterConfig::default().with_database("authz"),
    )
    .await
    .unwrap();
    adapter.save_policy(&sample_model()).await.unwrap();
    adapter
        .remove_policy("g", "g", &strings(&["alice", "admin"]))
        .await
        .unwrap();
    adapter.close().await.unwrap();

    assert!(dir.path().join("authz").join("casbin_rule.json").exists());

    let mut reopened = StoreAdapter::connect(
        Arc::new(FileClient::new(dir.path())),
        AdapterConfig::default().with_database("authz"),
    )
    .await
    .unwrap();
    let mut loaded = PolicyModel::new();
    reopened.load_policy(&mut loaded).await.unwrap();
    reopened.close().await.unwrap();

    assert_eq!(loaded.rule_count(), 1);
    assert_eq!(loaded.rules("p", "p"), &[strings(&["alice", "data1", "read"])]);
}

/// How a find stream misbehaves.
#[derive(Clone, Copy)]
enum StreamFault {
    /// Yield the first document, then fail the cursor.
    ResetAfterFirst,
    /// Yield every document, then one item the store could not decode.
    TrailingUndecodable,
}

/// Collection with a faulty find stream and a bulk insert that can be made
/// to fail.
struct FlakyCollection {
    inner: Arc<dyn DocumentCollection>,
    fault: StreamFault,
    fail_insert: AtomicBool,
}

#[async_trait]
impl DocumentCollection for FlakyCollection {
    async fn find(&self, selector: &Selector) -> Result<DocumentStream> {
        let docs: Vec<Result<Document>> = self.inner.find(selector).await?.collect().await;
        let (keep, tail) = match self.fault {
            StreamFault::ResetAfterFirst => (1, Error::cursor("connection reset")),
            StreamFault::TrailingUndecodable => {
                (docs.len(), Error::decode("invalid document encoding"))
            }
        };
        let faulty = stream::iter(docs.into_iter().take(keep))
            .chain(stream::once(async move { Err(tail) }));
        Ok(faulty.boxed())
    }

    async fn insert_one(&self, doc: Document) -> Result<()> {
        self.inner.insert_one(doc).await
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<usize> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(Error::connection("insert interrupted"));
        }
        self.inner.insert_many(docs).await
    }

    async fn delete_one(&self, selector: &Selector) -> Result<u64> {
        self.inner.delete_one(selector).await
    }

    async fn delete_many(&self, selector: &Selector) -> Result<u64> {
        self.inner.delete_many(selector).await
    }

    async fn drop_collection(&self) -> Result<()> {
        self.inner.drop_collection().await
    }
}

struct FlakyClient {
    inner: MemoryClient,
    collection: Arc<FlakyCollection>,
}

impl FlakyClient {
    fn new(inner: MemoryClient, fault: StreamFault) -> Self {
        let collection = Arc::new(FlakyCollection {
            inner: inner.collection("casbin", "casbin_rule"),
            fault,
            fail_insert: AtomicBool::new(false),
        });
        Self { inner, collection }
    }
}

#[async_trait]
impl DocumentClient for FlakyClient {
    async fn connect(&self) -> Result<()> {
        self.inner.connect().await
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.disconnect().await
    }

    fn collection(&self, _database: &str, _name: &str) -> Arc<dyn DocumentCollection> {
        self.collection.clone()
    }
}

#[tokio::test]
async fn cursor_error_surfaces_after_partial_load() {
    let client = MemoryClient::new();
    let flaky = FlakyClient::new(client.clone(), StreamFault::ResetAfterFirst);
    let mut adapter = StoreAdapter::connect(Arc::new(flaky), AdapterConfig::default())
        .await
        .unwrap();
    adapter.save_policy(&sample_model()).await.unwrap();

    let mut model = PolicyModel::new();
    let err = adapter.load_policy(&mut model).await.unwrap_err();

    assert!(matches!(err, Error::Cursor { .. }));
    assert!(err.is_recoverable());
    assert_eq!(model.rule_count(), 1);
    assert_eq!(adapter.metrics().records_loaded, 1);
}

#[tokio::test]
async fn undecodable_stream_item_is_skipped() {
    let client = MemoryClient::new();
    let flaky = FlakyClient::new(client.clone(), StreamFault::TrailingUndecodable);
    let mut adapter = StoreAdapter::connect(Arc::new(flaky), AdapterConfig::default())
        .await
        .unwrap();
    adapter.save_policy(&sample_model()).await.unwrap();

    let mut model = PolicyModel::new();
    adapter.load_policy(&mut model).await.unwrap();

    assert_eq!(model, sample_model());
    assert_eq!(adapter.metrics().records_loaded, 2);
    assert_eq!(adapter.metrics().records_skipped, 1);
    assert_eq!(adapter.metrics().errors, 0);
}

#[tokio::test]
async fn interrupted_save_leaves_store_empty() {
    let client = MemoryClient::new();
    let flaky = Arc::new(FlakyClient::new(client.clone(), StreamFault::ResetAfterFirst));
    let mut adapter = StoreAdapter::connect(flaky.clone(), AdapterConfig::default())
        .await
        .unwrap();
    adapter.save_policy(&sample_model()).await.unwrap();
    assert_eq!(client.collection_handle("casbin", "casbin_rule").len(), 2);

    flaky.collection.fail_insert.store(true, Ordering::SeqCst);
    let err = adapter.save_policy(&sample_model()).await.unwrap_err();

    assert!(matches!(err, Error::Connection { .. }));
    assert!(client.collection_handle("casbin", "casbin_rule").is_empty());
}
