//! Transient input decoding and validation.
//!
//! Mutating operations receive their data through the transient map rather
//! than positional arguments, so that names, owners and prices stay out of
//! the recorded call. Each operation has its own input type, decoded once
//! at the boundary and validated before anything touches the store.

use crate::error::{CoreError, CoreResult};
use marbles_codec::is_composite_key;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Side-channel input passed alongside a call.
pub type TransientMap = BTreeMap<String, Vec<u8>>;

/// An operation input carried in the transient map.
pub trait TransientInput: DeserializeOwned {
    /// Transient map key holding the JSON payload.
    const KEY: &'static str;

    /// Checks field-level constraints.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidField`] naming the first offending field.
    fn validate(&self) -> CoreResult<()>;
}

/// Extracts, decodes and validates `T` from the transient map.
///
/// # Errors
///
/// - [`CoreError::MissingField`] if `T::KEY` is absent or its value empty
/// - [`CoreError::MalformedInput`] if the value is not a JSON object of the
///   expected shape
/// - [`CoreError::InvalidField`] if a field fails validation
pub fn decode_transient<T: TransientInput>(transient: &TransientMap) -> CoreResult<T> {
    let payload = transient
        .get(T::KEY)
        .filter(|payload| !payload.is_empty())
        .ok_or_else(|| CoreError::missing_field(T::KEY))?;

    // Objects only: derived structs would also accept a positional array.
    let object: Map<String, Value> = serde_json::from_slice(payload)
        .map_err(|e| CoreError::malformed_input(T::KEY, e.to_string()))?;
    let input = T::deserialize(Value::Object(object))
        .map_err(|e| CoreError::malformed_input(T::KEY, e.to_string()))?;
    input.validate()?;
    Ok(input)
}

fn non_empty(field: &'static str, value: &str) -> CoreResult<()> {
    if value.is_empty() {
        return Err(CoreError::InvalidField {
            field,
            message: "must be a non-empty string",
        });
    }
    Ok(())
}

/// Names share the marbles collection with index entries, so a name must
/// not fall in the composite key namespace.
pub(crate) fn marble_name(value: &str) -> CoreResult<()> {
    non_empty("name", value)?;
    if is_composite_key(value) {
        return Err(CoreError::InvalidField {
            field: "name",
            message: "must not start with U+0000",
        });
    }
    Ok(())
}

fn positive(field: &'static str, value: i64) -> CoreResult<()> {
    if value <= 0 {
        return Err(CoreError::InvalidField {
            field,
            message: "must be a positive integer",
        });
    }
    Ok(())
}

/// Input of the create operation.
///
/// Absent fields decode to their defaults and then fail validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CreateMarble {
    /// Name of the new marble.
    pub name: String,
    /// Its color.
    pub color: String,
    /// Its size.
    pub size: i64,
    /// Its first owner.
    pub owner: String,
    /// Its price, stored in the private details.
    pub price: i64,
}

impl TransientInput for CreateMarble {
    const KEY: &'static str = "marble";

    fn validate(&self) -> CoreResult<()> {
        marble_name(&self.name)?;
        non_empty("color", &self.color)?;
        positive("size", self.size)?;
        non_empty("owner", &self.owner)?;
        positive("price", self.price)
    }
}

/// Input of the transfer operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransferMarble {
    /// Marble to transfer.
    pub name: String,
    /// New owner.
    pub owner: String,
}

impl TransientInput for TransferMarble {
    const KEY: &'static str = "marble_owner";

    fn validate(&self) -> CoreResult<()> {
        marble_name(&self.name)?;
        non_empty("owner", &self.owner)
    }
}

/// Input of the delete operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeleteMarble {
    /// Marble to delete.
    pub name: String,
}

impl TransientInput for DeleteMarble {
    const KEY: &'static str = "marble_delete";

    fn validate(&self) -> CoreResult<()> {
        marble_name(&self.name)
    }
}

/// A validated mutation, one variant per mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create a marble with its private details and index entry.
    Create(CreateMarble),
    /// Change a marble's owner.
    Transfer(TransferMarble),
    /// Delete a marble, its private details and index entry.
    Delete(DeleteMarble),
}

impl Mutation {
    /// Returns the name of the marble the mutation targets.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Create(input) => &input.name,
            Self::Transfer(input) => &input.name,
            Self::Delete(input) => &input.name,
        }
    }
}
