//! Key-value store trait definition.

use crate::error::StorageResult;
use bytes::Bytes;

/// Key-value pair returned from range and predicate queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: String,
    /// The value stored at this key.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A collection-partitioned key-value store.
///
/// This is the contract the registry core consumes. The store owns
/// durability, visibility and atomic commit; the core only issues reads
/// and writes against it.
///
/// # Invariants
///
/// - `get` after `put` in the same view returns the written value
/// - `get` after `delete` in the same view returns `None`
/// - `range` yields entries with `start <= key < end` in ascending key order
/// - `query` yields entries matching the expression in an unspecified order
pub trait KeyValueStore {
    /// Reads the value stored under `key` in `collection`.
    ///
    /// Returns `Ok(None)` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot serve the read.
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Bytes>>;

    /// Writes `value` under `key` in `collection`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be issued.
    fn put(&mut self, collection: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Removes `key` from `collection`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete cannot be issued.
    fn delete(&mut self, collection: &str, key: &str) -> StorageResult<()>;

    /// Returns all entries with `start <= key < end`, in key order.
    ///
    /// An empty `end` means "no upper bound".
    ///
    /// # Errors
    ///
    /// Returns an error if the iteration fails.
    fn range(&self, collection: &str, start: &str, end: &str) -> StorageResult<Vec<KeyValue>>;

    /// Evaluates an engine-specific predicate expression over `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression is invalid or evaluation fails.
    fn query(&self, collection: &str, expression: &str) -> StorageResult<Vec<KeyValue>>;
}
