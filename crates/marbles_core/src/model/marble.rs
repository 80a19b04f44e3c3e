//! The general marble record.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// A marble as stored in the general collection.
///
/// Serialized as a flat JSON object with the fields in declaration order:
/// `{"docType":..,"name":..,"color":..,"size":..,"owner":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marble {
    /// Discriminates record kinds sharing the collection namespace.
    #[serde(rename = "docType")]
    pub object_type: String,
    /// Unique name, also the store key.
    pub name: String,
    /// Color, the leading component of the color index.
    pub color: String,
    /// Size, always positive once persisted.
    pub size: i64,
    /// Current owner.
    pub owner: String,
}

impl Marble {
    /// Encodes the marble to its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encoding`] if serialization fails.
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CoreError::encoding(e.to_string()))
    }

    /// Decodes a marble from stored bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] if the bytes are not a marble object.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| CoreError::decode(format!("{e}: {}", String::from_utf8_lossy(bytes))))
    }
}
