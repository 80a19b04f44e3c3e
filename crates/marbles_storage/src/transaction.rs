//! Staged writes over an [`InMemoryStore`].

use crate::error::StorageResult;
use crate::memory::{evaluate, range_of, InMemoryStore};
use crate::store::{KeyValue, KeyValueStore};
use bytes::Bytes;
use std::collections::BTreeMap;
use tracing::debug;

/// A write transaction over an [`InMemoryStore`].
///
/// Writes are staged in the transaction and become visible to other readers
/// only on [`commit`](StoreTransaction::commit). Reads through the
/// transaction see its own staged writes (read-your-writes), including range
/// and predicate queries.
///
/// Dropping a transaction without committing discards its writes.
pub struct StoreTransaction<'a> {
    store: &'a InMemoryStore,
    /// `(collection, key)` to new value, `None` marking a delete.
    pending: BTreeMap<(String, String), Option<Bytes>>,
}

impl<'a> StoreTransaction<'a> {
    pub(crate) fn new(store: &'a InMemoryStore) -> Self {
        Self {
            store,
            pending: BTreeMap::new(),
        }
    }

    /// Returns the number of staged writes.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Applies all staged writes to the store atomically.
    pub fn commit(self) {
        debug!(writes = self.pending.len(), "committing store transaction");
        self.store.apply(self.pending);
    }

    /// Discards all staged writes.
    pub fn abort(self) {
        debug!(writes = self.pending.len(), "aborting store transaction");
    }

    /// Returns the committed entries of `collection` in `[start, end)` with the
    /// staged writes laid over them.
    fn merged_view(&self, collection: &str, start: &str, end: &str) -> BTreeMap<String, Bytes> {
        let mut view: BTreeMap<String, Bytes> = self.store.read_committed(|collections| {
            collections
                .get(collection)
                .map(|entries| {
                    range_of(entries, start, end)
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                })
                .unwrap_or_default()
        });

        let in_span = |key: &str| key >= start && (end.is_empty() || key < end);
        for ((staged_collection, key), value) in &self.pending {
            if staged_collection != collection || !in_span(key) {
                continue;
            }
            match value {
                Some(value) => {
                    view.insert(key.clone(), value.clone());
                }
                None => {
                    view.remove(key);
                }
            }
        }
        view
    }
}

impl KeyValueStore for StoreTransaction<'_> {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Bytes>> {
        if let Some(staged) = self.pending.get(&(collection.to_string(), key.to_string())) {
            return Ok(staged.clone());
        }
        self.store.get(collection, key)
    }

    fn put(&mut self, collection: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.pending.insert(
            (collection.to_string(), key.to_string()),
            Some(Bytes::from(value)),
        );
        Ok(())
    }

    fn delete(&mut self, collection: &str, key: &str) -> StorageResult<()> {
        self.pending
            .insert((collection.to_string(), key.to_string()), None);
        Ok(())
    }

    fn range(&self, collection: &str, start: &str, end: &str) -> StorageResult<Vec<KeyValue>> {
        if !end.is_empty() && start >= end {
            return Ok(Vec::new());
        }
        Ok(self
            .merged_view(collection, start, end)
            .into_iter()
            .map(|(key, value)| KeyValue::new(key, value))
            .collect())
    }

    fn query(&self, collection: &str, expression: &str) -> StorageResult<Vec<KeyValue>> {
        let view = self.merged_view(collection, "", "");
        evaluate(view.iter(), expression)
    }
}

impl std::fmt::Debug for StoreTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreTransaction")
            .field("pending_writes", &self.pending.len())
            .finish_non_exhaustive()
    }
}
