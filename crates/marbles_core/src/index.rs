//! The color/name secondary index.
//!
//! The index is a set of ordinary key-value entries in the marbles
//! collection. Each key is the composite `(color, name)` under the index
//! name; the value is a single sentinel byte. The store does not know these
//! entries are related to marbles, so every mutation that changes which
//! `(color, name)` pairs exist must go through [`ColorNameIndex`].

use crate::error::{CoreError, CoreResult};
use crate::model::Marble;
use marbles_codec::{create_composite_key, partial_key_range, split_composite_key};
use marbles_storage::KeyValueStore;

/// Value stored under every index key.
pub const INDEX_SENTINEL: u8 = 0x00;

/// Paired add/remove access to the color/name index.
#[derive(Debug, Clone, Copy)]
pub struct ColorNameIndex<'a> {
    collection: &'a str,
    index_name: &'a str,
}

impl<'a> ColorNameIndex<'a> {
    /// Creates an index handle over `collection`.
    pub fn new(collection: &'a str, index_name: &'a str) -> Self {
        Self {
            collection,
            index_name,
        }
    }

    /// Returns the index key for a color and name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if either value cannot be encoded.
    pub fn key(&self, color: &str, name: &str) -> CoreResult<String> {
        Ok(create_composite_key(self.index_name, &[color, name])?)
    }

    /// Writes the index entry for `marble`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be encoded or the write fails.
    pub fn add<S: KeyValueStore + ?Sized>(&self, store: &mut S, marble: &Marble) -> CoreResult<()> {
        let key = self.key(&marble.color, &marble.name)?;
        store.put(self.collection, &key, vec![INDEX_SENTINEL])?;
        Ok(())
    }

    /// Removes the index entry for `marble`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be encoded or the delete fails.
    pub fn remove<S: KeyValueStore + ?Sized>(&self, store: &mut S, marble: &Marble) -> CoreResult<()> {
        let key = self.key(&marble.color, &marble.name)?;
        store.delete(self.collection, &key)?;
        Ok(())
    }

    /// Returns `[start, end)` bounds covering every entry of `color`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if the color cannot be encoded.
    pub fn color_range(&self, color: &str) -> CoreResult<(String, String)> {
        Ok(partial_key_range(self.index_name, &[color])?)
    }

    /// Splits an index key into its color and name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] if the key belongs to another index or
    /// does not have exactly two segments.
    pub fn parse_key(&self, key: &str) -> CoreResult<(String, String)> {
        let (index_name, segments) = split_composite_key(key)?;
        if index_name != self.index_name {
            return Err(CoreError::decode(format!(
                "key belongs to index {index_name:?}, expected {:?}",
                self.index_name
            )));
        }
        match <[String; 2]>::try_from(segments) {
            Ok([color, name]) => Ok((color, name)),
            Err(segments) => Err(CoreError::decode(format!(
                "index key has {} segments, expected 2",
                segments.len()
            ))),
        }
    }
}
