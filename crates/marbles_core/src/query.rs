//! Range and predicate queries over the marbles collection.
//!
//! All queries return the same envelope, a JSON array of
//! `{"Key": <key>, "Record": <stored JSON>}` objects.
//!
//! # Consistency
//!
//! Range queries ([`QueryExecutor::range_query`],
//! [`QueryExecutor::query_by_color`]) are defined by their boundary keys
//! alone. A host that re-executes the transaction before commit sees the
//! same membership unless a key inside the bounds changed, so range results
//! are safe to feed into a mutation.
//!
//! Predicate queries ([`QueryExecutor::rich_query`],
//! [`QueryExecutor::query_by_owner`]) are evaluated by the store engine and
//! can return a different set for the same predicate at a later point
//! (phantom reads). Use them for point-in-time reads only, or accept that
//! the host may invalidate a transaction built on them.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::ColorNameIndex;
use marbles_storage::{KeyValue, KeyValueStore};
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::{debug, warn};

/// One element of a query result.
#[derive(Debug, Serialize)]
pub struct QueryRecord {
    /// Store key of the entry.
    #[serde(rename = "Key")]
    pub key: String,
    /// Stored value, embedded as-is. Values that are not JSON (index
    /// sentinels) are rendered as `null`.
    #[serde(rename = "Record")]
    pub record: Box<RawValue>,
}

impl QueryRecord {
    /// Wraps a store entry.
    #[must_use]
    pub fn from_key_value(entry: KeyValue) -> Self {
        let record = String::from_utf8(entry.value.to_vec())
            .ok()
            .and_then(|text| RawValue::from_string(text).ok())
            .unwrap_or_else(|| RawValue::NULL.to_owned());
        Self {
            key: entry.key,
            record,
        }
    }
}

/// Serializes query records into the result envelope.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if serialization fails.
pub fn render(records: &[QueryRecord]) -> CoreResult<Vec<u8>> {
    serde_json::to_vec(records).map_err(|e| CoreError::encoding(e.to_string()))
}

/// Read-only queries over the marbles collection.
pub struct QueryExecutor<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: KeyValueStore + ?Sized> QueryExecutor<'a, S> {
    /// Creates an executor over `store`.
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Returns every entry with `start <= key < end`, in key order.
    ///
    /// An empty span yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the iteration fails.
    pub fn range(&self, start: &str, end: &str) -> CoreResult<Vec<QueryRecord>> {
        let entries = self
            .store
            .range(&self.config.marbles_collection, start, end)?;
        debug!(start, end, count = entries.len(), "range query");
        Ok(entries.into_iter().map(QueryRecord::from_key_value).collect())
    }

    /// [`range`](Self::range), rendered as the JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the iteration fails.
    pub fn range_query(&self, start: &str, end: &str) -> CoreResult<Vec<u8>> {
        render(&self.range(start, end)?)
    }

    /// Evaluates a store-specific predicate expression, in store order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the expression is rejected or
    /// evaluation fails.
    pub fn rich(&self, expression: &str) -> CoreResult<Vec<QueryRecord>> {
        let entries = self
            .store
            .query(&self.config.marbles_collection, expression)?;
        debug!(expression, count = entries.len(), "predicate query");
        Ok(entries.into_iter().map(QueryRecord::from_key_value).collect())
    }

    /// [`rich`](Self::rich), rendered as the JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the expression is rejected or
    /// evaluation fails.
    pub fn rich_query(&self, expression: &str) -> CoreResult<Vec<u8>> {
        render(&self.rich(expression)?)
    }

    /// Builds the predicate selecting marbles owned by `owner`.
    ///
    /// The owner is lower-cased when the configuration asks for it.
    #[must_use]
    pub fn owner_selector(&self, owner: &str) -> String {
        let owner = if self.config.lowercase_owner_queries {
            owner.to_lowercase()
        } else {
            owner.to_string()
        };
        serde_json::json!({
            "selector": {
                "docType": self.config.marble_doc_type,
                "owner": owner,
            }
        })
        .to_string()
    }

    /// Returns the marbles owned by `owner`.
    ///
    /// # Errors
    ///
    /// As [`rich_query`](Self::rich_query).
    pub fn query_by_owner(&self, owner: &str) -> CoreResult<Vec<u8>> {
        self.rich_query(&self.owner_selector(owner))
    }

    /// Returns the marbles of `color` in name order, found through the
    /// color index.
    ///
    /// Each element is keyed by marble name and carries the marble record.
    /// Keys in range that do not parse as index entries, and index entries
    /// whose marble is missing, are skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Codec`] if the color cannot be encoded
    /// - [`CoreError::Store`] if a read fails
    pub fn by_color(&self, color: &str) -> CoreResult<Vec<QueryRecord>> {
        let index = ColorNameIndex::new(&self.config.marbles_collection, &self.config.color_index);
        let (start, end) = index.color_range(color)?;

        let mut records = Vec::new();
        for entry in self
            .store
            .range(&self.config.marbles_collection, &start, &end)?
        {
            let name = match index.parse_key(&entry.key) {
                Ok((_, name)) => name,
                Err(e) => {
                    warn!(color, key = ?entry.key, error = %e, "skipping malformed index key");
                    continue;
                }
            };
            match self.store.get(&self.config.marbles_collection, &name)? {
                Some(value) => records.push(QueryRecord::from_key_value(KeyValue::new(name, value))),
                None => warn!(color, name = %name, "index entry without marble"),
            }
        }
        debug!(color, count = records.len(), "color query");
        Ok(records)
    }

    /// [`by_color`](Self::by_color), rendered as the JSON envelope.
    ///
    /// # Errors
    ///
    /// As [`by_color`](Self::by_color).
    pub fn query_by_color(&self, color: &str) -> CoreResult<Vec<u8>> {
        render(&self.by_color(color)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::INDEX_SENTINEL;
    use marbles_storage::InMemoryStore;
    use serde_json::Value;

    fn put_marble(store: &mut InMemoryStore, name: &str, color: &str, owner: &str) {
        let record = format!(
            r#"{{"docType":"marble","name":"{name}","color":"{color}","size":1,"owner":"{owner}"}}"#
        );
        store
            .put("collectionMarbles", name, record.into_bytes())
            .unwrap();
        let key = marbles_codec::create_composite_key("color~name", &[color, name]).unwrap();
        store
            .put("collectionMarbles", &key, vec![INDEX_SENTINEL])
            .unwrap();
    }

    fn parse(bytes: &[u8]) -> Vec<Value> {
        serde_json::from_slice::<Vec<Value>>(bytes).unwrap()
    }

    #[test]
    fn range_query_preserves_order_and_embeds_records() {
        let config = Config::default();
        let mut store = InMemoryStore::new();
        put_marble(&mut store, "m2", "red", "bob");
        put_marble(&mut store, "m1", "blue", "alice");
        put_marble(&mut store, "m3", "blue", "alice");

        let bytes = QueryExecutor::new(&store, &config)
            .range_query("m1", "m3")
            .unwrap();
        let results = parse(&bytes);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["Key"], "m1");
        assert_eq!(results[0]["Record"]["owner"], "alice");
        assert_eq!(results[1]["Key"], "m2");
    }

    #[test]
    fn record_is_embedded_verbatim() {
        let config = Config::default();
        let mut store = InMemoryStore::new();
        store
            .put("collectionMarbles", "m1", br#"{"b":1, "a":2}"#.to_vec())
            .unwrap();

        let bytes = QueryExecutor::new(&store, &config)
            .range_query("m1", "m2")
            .unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"[{"Key":"m1","Record":{"b":1, "a":2}}]"#
        );
    }

    #[test]
    fn empty_span_yields_empty_array() {
        let config = Config::default();
        let store = InMemoryStore::new();
        let executor = QueryExecutor::new(&store, &config);
        assert_eq!(executor.range_query("a", "b").unwrap(), b"[]");
        assert_eq!(executor.range_query("b", "a").unwrap(), b"[]");
    }

    #[test]
    fn index_entries_render_with_null_record_and_escaped_key() {
        let config = Config::default();
        let mut store = InMemoryStore::new();
        put_marble(&mut store, "m1", "blue", "alice");

        let index = ColorNameIndex::new("collectionMarbles", "color~name");
        let (start, end) = index.color_range("blue").unwrap();
        let bytes = QueryExecutor::new(&store, &config)
            .range_query(&start, &end)
            .unwrap();

        let results = parse(&bytes);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["Key"], index.key("blue", "m1").unwrap());
        assert!(results[0]["Record"].is_null());
    }

    #[test]
    fn query_by_owner_lowercases_and_filters_doc_type() {
        let config = Config::default();
        let mut store = InMemoryStore::new();
        put_marble(&mut store, "m1", "blue", "alice");
        put_marble(&mut store, "m2", "red", "bob");
        store
            .put(
                "collectionMarbles",
                "other",
                br#"{"docType":"token","owner":"alice"}"#.to_vec(),
            )
            .unwrap();

        let executor = QueryExecutor::new(&store, &config);
        let results = parse(&executor.query_by_owner("ALICE").unwrap());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["Key"], "m1");

        assert_eq!(executor.query_by_owner("nobody").unwrap(), b"[]");
    }

    #[test]
    fn owner_selector_escapes_input() {
        let config = Config::default().lowercase_owner_queries(false);
        let store = InMemoryStore::new();
        let selector = QueryExecutor::new(&store, &config).owner_selector(r#"Al"ice"#);
        let parsed: Value = serde_json::from_str(&selector).unwrap();
        assert_eq!(parsed["selector"]["owner"], r#"Al"ice"#);
        assert_eq!(parsed["selector"]["docType"], "marble");
    }

    #[test]
    fn rich_query_passes_expression_through() {
        let config = Config::default();
        let mut store = InMemoryStore::new();
        put_marble(&mut store, "m1", "blue", "alice");
        put_marble(&mut store, "m2", "red", "bob");

        let executor = QueryExecutor::new(&store, &config);
        let results = parse(
            &executor
                .rich_query(r#"{"selector":{"color":{"$in":["red","green"]}}}"#)
                .unwrap(),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["Key"], "m2");

        let err = executor.rich_query("not a query").unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));
    }

    #[test]
    fn query_by_color_resolves_marbles_through_index() {
        let config = Config::default();
        let mut store = InMemoryStore::new();
        put_marble(&mut store, "m3", "blue", "carol");
        put_marble(&mut store, "m1", "blue", "alice");
        put_marble(&mut store, "m2", "red", "bob");
        let orphan = marbles_codec::create_composite_key("color~name", &["blue", "ghost"]).unwrap();
        store
            .put("collectionMarbles", &orphan, vec![INDEX_SENTINEL])
            .unwrap();

        let results = parse(
            &QueryExecutor::new(&store, &config)
                .query_by_color("blue")
                .unwrap(),
        );
        let keys: Vec<&str> = results.iter().map(|r| r["Key"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["m1", "m3"]);
        assert_eq!(results[1]["Record"]["owner"], "carol");
    }

    #[test]
    fn query_by_color_skips_malformed_keys_in_range() {
        let config = Config::default();
        let mut store = InMemoryStore::new();
        put_marble(&mut store, "m1", "blue", "alice");

        let index = ColorNameIndex::new("collectionMarbles", "color~name");
        let (start, _) = index.color_range("blue").unwrap();
        // Unterminated component, then a key with three segments.
        store
            .put("collectionMarbles", &format!("{start}zz"), vec![INDEX_SENTINEL])
            .unwrap();
        let extra = marbles_codec::create_composite_key("color~name", &["blue", "m1", "x"]).unwrap();
        store
            .put("collectionMarbles", &extra, vec![INDEX_SENTINEL])
            .unwrap();

        let results = parse(
            &QueryExecutor::new(&store, &config)
                .query_by_color("blue")
                .unwrap(),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["Key"], "m1");
    }
}
