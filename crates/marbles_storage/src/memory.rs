//! In-memory reference store.

use crate::error::StorageResult;
use crate::selector::Selector;
use crate::store::{KeyValue, KeyValueStore};
use crate::transaction::StoreTransaction;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

pub(crate) type Collections = BTreeMap<String, BTreeMap<String, Bytes>>;

/// An in-memory, collection-partitioned key-value store.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - The command-line tool, which persists it as a [`StoreSnapshot`]
///
/// Writes issued directly through [`KeyValueStore`] apply immediately.
/// Use [`InMemoryStore::transaction`] to group writes so they commit or
/// abort together.
///
/// # Example
///
/// ```rust
/// use marbles_storage::{InMemoryStore, KeyValueStore, StorageError};
///
/// let store = InMemoryStore::new();
/// let result: Result<(), StorageError> = store.transaction(|txn| {
///     txn.put("c", "a", b"1".to_vec())?;
///     txn.put("c", "b", b"2".to_vec())?;
///     Ok(())
/// });
/// assert!(result.is_ok());
/// assert_eq!(store.len("c"), 2);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<Collections>,
}

/// Serializable image of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Collection name to (key to value bytes).
    pub collections: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl StoreSnapshot {
    /// Serializes the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`](crate::StorageError::Serialization)
    /// if serialization fails.
    pub fn to_json(&self) -> StorageResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parses a snapshot written by [`to_json`](Self::to_json).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`](crate::StorageError::Serialization)
    /// if the bytes are not a snapshot.
    pub fn from_json(bytes: &[u8]) -> StorageResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the contents of a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let collections = snapshot
            .collections
            .into_iter()
            .map(|(name, entries)| {
                let entries = entries
                    .into_iter()
                    .map(|(key, value)| (key, Bytes::from(value)))
                    .collect();
                (name, entries)
            })
            .collect();
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Returns a copy of the store contents.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let collections = self
            .collections
            .read()
            .iter()
            .map(|(name, entries)| {
                let entries = entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_vec()))
                    .collect();
                (name.clone(), entries)
            })
            .collect();
        StoreSnapshot { collections }
    }

    /// Returns the number of keys in a collection.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Returns true if the collection holds no keys.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Returns the names of all non-empty collections.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        self.collections
            .read()
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Begins a transaction over this store.
    pub fn begin(&self) -> StoreTransaction<'_> {
        StoreTransaction::new(self)
    }

    /// Executes a function within a transaction.
    ///
    /// If the function returns `Ok`, all staged writes are applied at once.
    /// If it returns `Err`, the staged writes are discarded.
    pub fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut StoreTransaction<'_>) -> Result<T, E>,
    {
        let mut txn = self.begin();
        match f(&mut txn) {
            Ok(result) => {
                txn.commit();
                Ok(result)
            }
            Err(e) => {
                txn.abort();
                Err(e)
            }
        }
    }

    pub(crate) fn read_committed<R>(&self, f: impl FnOnce(&Collections) -> R) -> R {
        f(&self.collections.read())
    }

    pub(crate) fn apply(&self, writes: BTreeMap<(String, String), Option<Bytes>>) {
        let mut collections = self.collections.write();
        for ((collection, key), value) in writes {
            match value {
                Some(value) => {
                    collections.entry(collection).or_default().insert(key, value);
                }
                None => {
                    if let Some(entries) = collections.get_mut(&collection) {
                        entries.remove(&key);
                    }
                }
            }
        }
    }
}

/// Returns the entries of `entries` with `start <= key < end`.
///
/// An empty `end` is unbounded. Inverted or empty spans yield nothing.
pub(crate) fn range_of<'a>(
    entries: &'a BTreeMap<String, Bytes>,
    start: &'a str,
    end: &'a str,
) -> Box<dyn Iterator<Item = (&'a String, &'a Bytes)> + 'a> {
    if !end.is_empty() && start >= end {
        return Box::new(std::iter::empty());
    }
    let upper = if end.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Excluded(end)
    };
    Box::new(entries.range::<str, _>((Bound::Included(start), upper)))
}

/// Evaluates a predicate expression over entries in key order.
pub(crate) fn evaluate<'a>(
    entries: impl Iterator<Item = (&'a String, &'a Bytes)>,
    expression: &str,
) -> StorageResult<Vec<KeyValue>> {
    let selector = Selector::parse(expression)?;
    let matching = entries
        .filter(|(_, value)| selector.matches_bytes(value))
        .map(|(key, value)| KeyValue::new(key.clone(), value.clone()));
    Ok(match selector.limit() {
        Some(limit) => matching.take(limit).collect(),
        None => matching.collect(),
    })
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Bytes>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn put(&mut self, collection: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), Bytes::from(value));
        Ok(())
    }

    fn delete(&mut self, collection: &str, key: &str) -> StorageResult<()> {
        if let Some(entries) = self.collections.write().get_mut(collection) {
            entries.remove(key);
        }
        Ok(())
    }

    fn range(&self, collection: &str, start: &str, end: &str) -> StorageResult<Vec<KeyValue>> {
        let collections = self.collections.read();
        Ok(collections.get(collection).map_or_else(Vec::new, |entries| {
            range_of(entries, start, end)
                .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
                .collect()
        }))
    }

    fn query(&self, collection: &str, expression: &str) -> StorageResult<Vec<KeyValue>> {
        let collections = self.collections.read();
        match collections.get(collection) {
            Some(entries) => evaluate(entries.iter(), expression),
            None => evaluate(std::iter::empty::<(&String, &Bytes)>(), expression),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use proptest::prelude::*;

    fn keys(entries: &[KeyValue]) -> Vec<&str> {
        entries.iter().map(|kv| kv.key.as_str()).collect()
    }

    #[test]
    fn snapshot_json_round_trip() {
        let mut store = InMemoryStore::new();
        store.put("c", "\u{0}i\u{0}k\u{0}", vec![0x00]).unwrap();
        let json = store.snapshot().to_json().unwrap();
        let restored = InMemoryStore::from_snapshot(StoreSnapshot::from_json(&json).unwrap());
        assert_eq!(restored.snapshot(), store.snapshot());

        let err = StoreSnapshot::from_json(b"[1]").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty("c"));
        assert!(store.collection_names().is_empty());
    }

    #[test]
    fn memory_put_get_delete() {
        let mut store = InMemoryStore::new();
        store.put("c", "k", b"v".to_vec()).unwrap();
        assert_eq!(store.get("c", "k").unwrap(), Some(Bytes::from_static(b"v")));
        assert_eq!(store.get("other", "k").unwrap(), None);

        store.delete("c", "k").unwrap();
        assert_eq!(store.get("c", "k").unwrap(), None);
        store.delete("c", "missing").unwrap();
    }

    #[test]
    fn memory_collections_are_isolated() {
        let mut store = InMemoryStore::new();
        store.put("a", "k", b"1".to_vec()).unwrap();
        store.put("b", "k", b"2".to_vec()).unwrap();
        assert_eq!(store.get("a", "k").unwrap().unwrap(), &b"1"[..]);
        assert_eq!(store.get("b", "k").unwrap().unwrap(), &b"2"[..]);
        assert_eq!(store.collection_names(), vec!["a", "b"]);
    }

    #[test]
    fn memory_range_is_ordered_and_half_open() {
        let mut store = InMemoryStore::new();
        for key in ["m3", "m1", "m2", "m4"] {
            store.put("c", key, b"{}".to_vec()).unwrap();
        }
        let entries = store.range("c", "m1", "m3").unwrap();
        assert_eq!(keys(&entries), vec!["m1", "m2"]);

        let entries = store.range("c", "m2", "").unwrap();
        assert_eq!(keys(&entries), vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn memory_range_empty_and_inverted_spans() {
        let mut store = InMemoryStore::new();
        store.put("c", "m1", b"{}".to_vec()).unwrap();
        assert!(store.range("c", "m1", "m1").unwrap().is_empty());
        assert!(store.range("c", "m9", "m1").unwrap().is_empty());
        assert!(store.range("missing", "a", "z").unwrap().is_empty());
    }

    #[test]
    fn memory_query_filters_json_values() {
        let mut store = InMemoryStore::new();
        store.put("c", "a", br#"{"owner":"alice"}"#.to_vec()).unwrap();
        store.put("c", "b", br#"{"owner":"bob"}"#.to_vec()).unwrap();
        store.put("c", "\u{0}idx", vec![0x00]).unwrap();

        let entries = store.query("c", r#"{"selector":{"owner":"bob"}}"#).unwrap();
        assert_eq!(keys(&entries), vec!["b"]);

        let entries = store.query("c", r#"{"selector":{},"limit":1}"#).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn memory_query_rejects_bad_expression() {
        let store = InMemoryStore::new();
        let result = store.query("c", "nope");
        assert!(matches!(result, Err(StorageError::InvalidQuery { .. })));
    }

    #[test]
    fn memory_snapshot_roundtrip() {
        let mut store = InMemoryStore::new();
        store.put("c", "k", vec![0x00, 0xff]).unwrap();
        let snapshot = store.snapshot();

        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = InMemoryStore::from_snapshot(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.get("c", "k").unwrap().unwrap(), &[0x00u8, 0xff][..]);
    }

    proptest! {
        #[test]
        fn range_is_sorted_and_bounded(
            stored in prop::collection::btree_set("[a-e]{0,3}", 0..20),
            start in "[a-e]{0,3}",
            end in "[a-e]{1,3}",
        ) {
            let mut store = InMemoryStore::new();
            for key in &stored {
                store.put("c", key, b"{}".to_vec()).unwrap();
            }

            let expected: Vec<&str> = stored
                .iter()
                .map(String::as_str)
                .filter(|k| *k >= start.as_str() && *k < end.as_str())
                .collect();
            let entries = store.range("c", &start, &end).unwrap();
            prop_assert_eq!(keys(&entries), expected);
        }
    }
}
