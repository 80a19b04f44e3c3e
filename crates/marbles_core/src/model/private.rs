//! The restricted private details record.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Private details of a marble, stored in the restricted collection under
/// the marble's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarblePrivateDetails {
    /// Discriminates record kinds sharing the collection namespace.
    #[serde(rename = "docType")]
    pub object_type: String,
    /// Name of the paired marble.
    pub name: String,
    /// Price, always positive once persisted.
    pub price: i64,
}

impl MarblePrivateDetails {
    /// Encodes the details to their stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encoding`] if serialization fails.
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CoreError::encoding(e.to_string()))
    }

    /// Decodes details from stored bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] if the bytes are not a details object.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| CoreError::decode(format!("{e}: {}", String::from_utf8_lossy(bytes))))
    }
}
