//! # Marbles Codec
//!
//! Composite key encoding for the marble registry.
//!
//! Secondary indexes are stored as ordinary key-value entries whose keys
//! pack several logical fields. This crate provides the encoding:
//! - Identical tuples produce identical keys
//! - Keys split back into exactly the tuple that built them
//! - Bytewise key order equals tuple order, so prefix range scans work
//!
//! ## Usage
//!
//! ```
//! use marbles_codec::{create_composite_key, split_composite_key};
//!
//! let key = create_composite_key("color~name", &["blue", "m1"]).unwrap();
//! let (index, segments) = split_composite_key(&key).unwrap();
//! assert_eq!(index, "color~name");
//! assert_eq!(segments, ["blue", "m1"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod composite;
mod error;

pub use composite::{
    create_composite_key, is_composite_key, partial_key_range, split_composite_key, CompositeKey,
    MAX_UNICODE_RUNE, NAMESPACE,
};
pub use error::{CodecError, CodecResult};
