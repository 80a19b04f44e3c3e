//! # Marbles Core
//!
//! Private marble registry: records, their private details, the color index
//! and queries, on top of a [`KeyValueStore`](marbles_storage::KeyValueStore).
//!
//! This crate provides:
//! - Typed, validated inputs decoded from the transient map
//! - A repository that keeps marbles, private details and the color index
//!   consistent
//! - Range, predicate, owner and color queries with a JSON result envelope
//! - Function dispatch with request-scoped tracing spans
//!
//! ## Example
//!
//! ```rust
//! use marbles_core::{Invocation, MarblesContract};
//! use marbles_storage::InMemoryStore;
//!
//! let contract = MarblesContract::default();
//! let mut store = InMemoryStore::new();
//!
//! let create = Invocation::new("create").transient(
//!     "marble",
//!     r#"{"name":"m1","color":"blue","size":35,"owner":"alice","price":99}"#,
//! );
//! assert!(contract.invoke(&mut store, &create).is_ok());
//!
//! let owned = contract.invoke(&mut store, &Invocation::new("queryByOwner").arg("alice"));
//! assert!(String::from_utf8(owned.payload).unwrap().contains("\"Key\":\"m1\""));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatch;
mod error;
mod index;
mod input;
mod model;
mod query;
mod repository;

pub use config::Config;
pub use dispatch::{Function, Invocation, MarblesContract, Response, STATUS_ERROR, STATUS_OK};
pub use error::{CoreError, CoreResult, RecordKind};
pub use index::{ColorNameIndex, INDEX_SENTINEL};
pub use input::{
    decode_transient, CreateMarble, DeleteMarble, Mutation, TransferMarble, TransientInput,
    TransientMap,
};
pub use model::{Marble, MarblePrivateDetails};
pub use query::{render, QueryExecutor, QueryRecord};
pub use repository::MarbleRepository;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
