//! Public API of the adapter.
//!
//! [`Adapter`] is the contract the enforcement engine drives; [`StoreAdapter`]
//! implements it on top of any [`DocumentClient`](crate::store::DocumentClient).

mod adapter;
mod connection;

pub use adapter::{Adapter, StoreAdapter};
pub use connection::{Borrowed, Owned, Ownership};
