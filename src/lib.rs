//! # Policy Store Adapter
//!
//! Document-store persistence for authorization policy rules. The adapter
//! stores every rule of a policy model as one document of the form
//! `{ptype, v0, v1, v2, v3, v4, v5}` and implements the load, save and
//! incremental add/remove contract that policy enforcement engines expect
//! from a storage backend.
//!
//! ## Features
//!
//! - **Rule codec**: maps variable-length rule tuples to fixed six-field records
//! - **Selectors**: field-window filters for removing or loading subsets of rules
//! - **Filtered loads**: tracks partial loads and refuses to overwrite the
//!   full policy with them
//! - **Pluggable stores**: any document database behind [`store::DocumentClient`];
//!   in-memory and JSON-file stores included
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use policy_store_adapter::{Adapter, AdapterConfig, MemoryClient, PolicyModel, StoreAdapter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(MemoryClient::new());
//!     let mut adapter = StoreAdapter::connect(client, AdapterConfig::default()).await?;
//!
//!     let rule = vec!["alice".to_string(), "data1".to_string(), "read".to_string()];
//!     adapter.add_policy("p", "p", &rule).await?;
//!
//!     let mut model = PolicyModel::new();
//!     adapter.load_policy(&mut model).await?;
//!     assert_eq!(model.rules("p", "p"), &[rule]);
//!
//!     adapter.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod config;
pub mod error;
pub mod policy;
pub mod store;
pub mod telemetry;

// Re-export main types for convenience
pub use api::{Adapter, Borrowed, Owned, Ownership, StoreAdapter};
pub use config::AdapterConfig;
pub use error::{Error, Result};
pub use policy::{PolicyModel, RuleRecord, Selector};
pub use store::{DocumentClient, DocumentCollection, FileClient, MemoryClient, StoreUrl};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
