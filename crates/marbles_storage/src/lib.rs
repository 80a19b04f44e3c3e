//! # Marbles Storage
//!
//! The key-value store collaborator consumed by the marble registry core.
//!
//! The store is an ordered byte store partitioned into named collections.
//! It does not interpret the values it holds, except when asked to evaluate
//! a predicate query.
//!
//! ## Design Principles
//!
//! - Keys are strings, values are opaque bytes
//! - Range iteration is ordered by key bytes, start inclusive, end exclusive
//! - Predicate queries are engine-defined and carry no ordering guarantee
//! - Atomicity across several writes belongs to the store's transaction
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - Reference store for tests and the CLI
//! - [`StoreTransaction`] - Staged writes with read-your-writes, applied on commit
//!
//! ## Example
//!
//! ```rust
//! use marbles_storage::{InMemoryStore, KeyValueStore};
//!
//! let mut store = InMemoryStore::new();
//! store.put("collectionMarbles", "m1", b"{}".to_vec()).unwrap();
//! let value = store.get("collectionMarbles", "m1").unwrap();
//! assert_eq!(value.as_deref(), Some(&b"{}"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod selector;
mod store;
mod transaction;

pub use error::{StorageError, StorageResult};
pub use memory::{InMemoryStore, StoreSnapshot};
pub use selector::Selector;
pub use store::{KeyValue, KeyValueStore};
pub use transaction::StoreTransaction;
