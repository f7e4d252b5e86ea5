//! Policy store adapter implementation.

use super::connection::{Borrowed, Owned, Ownership};
use crate::config::AdapterConfig;
use crate::policy::{
    encode_rule, load_document, PolicyModel, Selector, GROUPING_SECTION, POLICY_SECTION,
};
use crate::store::{Document, DocumentClient, DocumentCollection};
use crate::telemetry::{AdapterMetrics, MetricsSnapshot};
use crate::{Error, Result};

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage backend contract used by the policy enforcement engine.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Load every stored rule into `model`.
    async fn load_policy(&mut self, model: &mut PolicyModel) -> Result<()>;

    /// Load the stored rules matching `filter` into `model`.
    ///
    /// A missing or empty filter loads everything and clears the filtered
    /// state; any other filter sets it.
    async fn load_filtered_policy(
        &mut self,
        model: &mut PolicyModel,
        filter: Option<&Selector>,
    ) -> Result<()>;

    /// Whether the last load only covered a subset of the stored rules.
    fn is_filtered(&self) -> bool;

    /// Replace every stored rule with the `p` and `g` rules of `model`.
    async fn save_policy(&mut self, model: &PolicyModel) -> Result<()>;

    /// Store one rule.
    async fn add_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> Result<()>;

    /// Delete one stored rule equal to `rule` on every field.
    async fn remove_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> Result<()>;

    /// Delete every stored rule of `ptype` whose fields starting at
    /// `field_index` match the non-empty `field_values`.
    async fn remove_filtered_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: i32,
        field_values: &[String],
    ) -> Result<()>;
}

/// Adapter storing one document per rule in a document collection.
///
/// The adapter keeps no lock of its own: loads and saves that must not
/// interleave have to be serialized by the caller.
pub struct StoreAdapter<O: Ownership = Borrowed> {
    collection: Arc<dyn DocumentCollection>,
    config: AdapterConfig,
    filtered: bool,
    metrics: AdapterMetrics,
    ownership: O,
}

impl StoreAdapter<Owned> {
    /// Connect `client` and build an adapter that owns the connection.
    ///
    /// Call [`close`](Self::close) when done.
    pub async fn connect(client: Arc<dyn DocumentClient>, config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        client.connect().await?;
        info!(
            database = %config.database,
            collection = %config.collection,
            "connected policy store"
        );

        let collection = client.collection(&config.database, &config.collection);
        Ok(Self::with_parts(collection, config, Owned::new(client)))
    }

    /// Connect to the store named by `config.url`.
    pub async fn open(config: AdapterConfig) -> Result<Self> {
        let url = config.store_url()?;
        debug!(url = %url, "opening policy store");
        Self::connect(url.client(), config).await
    }

    /// Like [`connect`](Self::connect), but starts in the filtered state.
    ///
    /// The engine is expected to call `load_filtered_policy` instead of
    /// `load_policy`; a full save is refused until an unfiltered load.
    pub async fn connect_filtered(
        client: Arc<dyn DocumentClient>,
        config: AdapterConfig,
    ) -> Result<Self> {
        Self::connect(client, config.with_filtered(true)).await
    }

    /// Disconnect the owned client.
    pub async fn close(mut self) -> Result<()> {
        self.ownership.release().await
    }
}

impl StoreAdapter<Borrowed> {
    /// Build an adapter over a client the caller has already connected.
    ///
    /// The adapter neither connects nor disconnects `client`.
    pub fn from_client(client: &dyn DocumentClient, config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        let collection = client.collection(&config.database, &config.collection);
        Ok(Self::with_parts(collection, config, Borrowed::new()))
    }
}

impl<O: Ownership> StoreAdapter<O> {
    fn with_parts(collection: Arc<dyn DocumentCollection>, config: AdapterConfig, ownership: O) -> Self {
        Self {
            collection,
            filtered: config.filtered,
            config,
            metrics: AdapterMetrics::new(),
            ownership,
        }
    }

    /// Adapter configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Counters of what the adapter has done so far.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            self.metrics.record_error(e);
        }
        result
    }

    async fn load_matching(&self, model: &mut PolicyModel, selector: &Selector) -> Result<()> {
        let mut cursor = self.collection.find(selector).await?;
        let mut loaded = 0usize;
        let mut skipped = 0usize;
        let mut failure = None;

        while let Some(item) = cursor.next().await {
            let decoded = match item {
                Ok(doc) => load_document(&doc, model),
                Err(e @ Error::Decode { .. }) => Err(e),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            match decoded {
                Ok(()) => {
                    loaded += 1;
                    self.metrics.record_loaded();
                }
                Err(e) => {
                    skipped += 1;
                    self.metrics.record_skipped();
                    warn!(error = %e, "skipping stored policy record that cannot be decoded");
                }
            }
        }
        drop(cursor);

        debug!(loaded, skipped, filtered = self.filtered, "loaded policy records");

        match failure {
            None => Ok(()),
            Some(e @ Error::Cursor { .. }) => Err(e),
            Some(e) => Err(Error::cursor(e.to_string())),
        }
    }

    fn encode_model(model: &PolicyModel) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        for sec in [POLICY_SECTION, GROUPING_SECTION] {
            for (ptype, rules) in model.section(sec) {
                for rule in rules {
                    docs.push(encode_rule(ptype, rule)?.to_document());
                }
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl<O: Ownership> Adapter for StoreAdapter<O> {
    async fn load_policy(&mut self, model: &mut PolicyModel) -> Result<()> {
        self.load_filtered_policy(model, None).await
    }

    async fn load_filtered_policy(
        &mut self,
        model: &mut PolicyModel,
        filter: Option<&Selector>,
    ) -> Result<()> {
        let selector = match filter {
            Some(filter) if !filter.is_empty() => {
                self.filtered = true;
                filter.clone()
            }
            _ => {
                self.filtered = false;
                Selector::new()
            }
        };

        let result = self.load_matching(model, &selector).await;
        self.observe(result)
    }

    fn is_filtered(&self) -> bool {
        self.filtered
    }

    async fn save_policy(&mut self, model: &PolicyModel) -> Result<()> {
        if self.filtered {
            return self.observe(Err(Error::FilteredSave));
        }

        let docs = self.observe(Self::encode_model(model))?;

        // Not transactional: a failure after the drop leaves the collection empty.
        self.observe(self.collection.drop_collection().await)?;
        if docs.is_empty() {
            info!("saved empty policy");
            return Ok(());
        }

        let inserted = self.observe(self.collection.insert_many(docs).await)?;
        self.metrics.record_inserted(inserted as u64);
        info!(rules = inserted, "saved policy");
        Ok(())
    }

    async fn add_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> Result<()> {
        let record = self.observe(encode_rule(ptype, rule))?;
        self.observe(self.collection.insert_one(record.to_document()).await)?;
        self.metrics.record_inserted(1);
        debug!(sec, ptype, ?rule, "added policy rule");
        Ok(())
    }

    async fn remove_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> Result<()> {
        let record = self.observe(encode_rule(ptype, rule))?;
        let removed = self.observe(self.collection.delete_one(&Selector::for_rule(&record)).await)?;
        self.metrics.record_removed(removed);
        debug!(sec, ptype, ?rule, removed, "removed policy rule");
        Ok(())
    }

    async fn remove_filtered_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: i32,
        field_values: &[String],
    ) -> Result<()> {
        let selector = Selector::for_filtered_removal(ptype, field_index, field_values);
        let removed = self.observe(self.collection.delete_many(&selector).await)?;
        self.metrics.record_removed(removed);
        debug!(sec, ptype, field_index, ?field_values, removed, "removed filtered policy rules");
        Ok(())
    }
}
