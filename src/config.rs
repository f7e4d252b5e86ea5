//! Adapter configuration.
//!
//! Settings are layered: built-in defaults, then an optional configuration
//! file, then `POLICY_STORE_*` environment variables.

use crate::store::StoreUrl;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default store URL.
pub const DEFAULT_URL: &str = "memory://";

/// Default database holding the rule collection.
pub const DEFAULT_DATABASE: &str = "casbin";

/// Default collection holding one document per rule.
pub const DEFAULT_COLLECTION: &str = "casbin_rule";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "POLICY_STORE";

/// Where the adapter keeps its rules and how it starts out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Store URL, `memory://` or `file://<dir>`
    #[serde(default = "default_url")]
    pub url: String,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    /// Collection name
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Start in the filtered state, so a full save is refused until an
    /// unfiltered load has happened
    #[serde(default)]
    pub filtered: bool,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            database: default_database(),
            collection: default_collection(),
            filtered: false,
        }
    }
}

impl AdapterConfig {
    /// Load configuration from `POLICY_STORE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load configuration from an optional file (YAML, JSON or TOML, by
    /// extension) overlaid with environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("url", DEFAULT_URL)?
            .set_default("database", DEFAULT_DATABASE)?
            .set_default("collection", DEFAULT_COLLECTION)?
            .set_default("filtered", false)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let config: AdapterConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Set the store URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the initial filtered state.
    pub fn with_filtered(mut self, filtered: bool) -> Self {
        self.filtered = filtered;
        self
    }

    /// Parsed store URL.
    pub fn store_url(&self) -> Result<StoreUrl> {
        StoreUrl::parse(&self.url)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.store_url()?;
        if self.database.trim().is_empty() {
            return Err(Error::config_key("database name cannot be empty", "database"));
        }
        if self.collection.trim().is_empty() {
            return Err(Error::config_key(
                "collection name cannot be empty",
                "collection",
            ));
        }
        Ok(())
    }
}
