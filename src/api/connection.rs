//! Who owns the document store connection.
//!
//! An adapter built with [`StoreAdapter::connect`](super::StoreAdapter::connect)
//! opens the connection itself and carries [`Owned`]; it must be released with
//! `close`. An adapter built with
//! [`StoreAdapter::from_client`](super::StoreAdapter::from_client) carries
//! [`Borrowed`] and never disconnects the caller's client.

use crate::store::DocumentClient;
use crate::Result;

use std::sync::Arc;
use tracing::{debug, warn};

mod sealed {
    pub trait Sealed {}
}

/// Connection ownership mode of an adapter.
pub trait Ownership: sealed::Sealed + Send + Sync {}

/// The adapter opened the connection and is responsible for closing it.
///
/// Dropped without `close`, it disconnects in the background.
pub struct Owned {
    client: Option<Arc<dyn DocumentClient>>,
}

/// The caller supplied a connected client and keeps responsibility for it.
pub struct Borrowed {
    _private: (),
}

impl sealed::Sealed for Owned {}
impl sealed::Sealed for Borrowed {}
impl Ownership for Owned {}
impl Ownership for Borrowed {}

impl Owned {
    pub(crate) fn new(client: Arc<dyn DocumentClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Disconnect now. Later calls are no-ops.
    pub(crate) async fn release(&mut self) -> Result<()> {
        match self.client.take() {
            Some(client) => {
                debug!("disconnecting document store client");
                client.disconnect().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for Owned {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("owned policy store adapter dropped without close, disconnecting in background");
                handle.spawn(async move {
                    if let Err(e) = client.disconnect().await {
                        warn!(error = %e, "background disconnect failed");
                    }
                });
            }
            Err(_) => {
                warn!("owned policy store adapter dropped outside a tokio runtime, connection left open");
            }
        }
    }
}

impl Borrowed {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}
