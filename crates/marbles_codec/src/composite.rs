//! Composite keys for range-scannable secondary indexes.
//!
//! A composite key packs an index name and an ordered tuple of string
//! segments into one store key:
//!
//! ```text
//! U+0000 esc(index) U+0000 esc(seg_1) U+0000 ... esc(seg_n) U+0000
//! ```
//!
//! Inside each component `U+0000` is written as `U+0001 U+0001` and `U+0001`
//! as `U+0001 U+0002`. Every other character is written as-is. This keeps the
//! key valid UTF-8, makes splitting unambiguous whatever the segments
//! contain, and preserves order: comparing two encoded keys bytewise gives
//! the same result as comparing their `(index, segments..)` tuples
//! component by component.
//!
//! The leading `U+0000` keeps composite keys sorted before every plain key
//! that does not itself start with `U+0000`.
//!
//! ## Prefix scans
//!
//! [`partial_key_range`] returns `[start, end)` bounds where `start` is the
//! encoded prefix and `end` is `start` followed by `U+10FFFF`. Because
//! `U+10FFFF` is rejected inside components, every key carrying the prefix
//! falls strictly inside the bounds and no other key does.
//!
//! ```rust
//! use marbles_codec::{create_composite_key, partial_key_range, split_composite_key};
//!
//! let key = create_composite_key("color~name", &["blue", "m1"]).unwrap();
//! let (start, end) = partial_key_range("color~name", &["blue"]).unwrap();
//! assert!(start <= key && key < end);
//!
//! let (index, segments) = split_composite_key(&key).unwrap();
//! assert_eq!(index, "color~name");
//! assert_eq!(segments, vec!["blue", "m1"]);
//! ```

use crate::error::{CodecError, CodecResult};

/// Marker that starts every composite key.
pub const NAMESPACE: char = '\u{0}';

/// Terminates every component of a composite key.
const TERMINATOR: char = '\u{0}';

/// Introduces an escaped `U+0000` or `U+0001` inside a component.
const ESCAPE: char = '\u{1}';

/// Upper bound appended to a prefix to close a range scan.
pub const MAX_UNICODE_RUNE: char = char::MAX;

/// A decoded composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    /// Name of the index this key belongs to.
    pub index_name: String,
    /// The indexed segments, in order.
    pub segments: Vec<String>,
}

impl CompositeKey {
    /// Creates a new composite key.
    pub fn new<S: Into<String>>(index_name: impl Into<String>, segments: impl IntoIterator<Item = S>) -> Self {
        Self {
            index_name: index_name.into(),
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Encodes this key to its store representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the index name is empty or any component
    /// contains `U+10FFFF`.
    pub fn encode(&self) -> CodecResult<String> {
        create_composite_key(&self.index_name, &self.segments)
    }

    /// Decodes a store key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedKey`] if `key` is not a composite key.
    pub fn decode(key: &str) -> CodecResult<Self> {
        let (index_name, segments) = split_composite_key(key)?;
        Ok(Self {
            index_name,
            segments,
        })
    }
}

/// Builds the store key for `index_name` and `segments`.
///
/// # Errors
///
/// Returns [`CodecError::EmptyIndexName`] for an empty index name and
/// [`CodecError::InvalidSegment`] if any component contains `U+10FFFF`.
pub fn create_composite_key<S: AsRef<str>>(index_name: &str, segments: &[S]) -> CodecResult<String> {
    if index_name.is_empty() {
        return Err(CodecError::EmptyIndexName);
    }
    validate_component(index_name)?;

    let capacity = 2
        + index_name.len()
        + segments.iter().map(|s| s.as_ref().len() + 1).sum::<usize>();
    let mut key = String::with_capacity(capacity);
    key.push(NAMESPACE);
    push_component(&mut key, index_name);

    for segment in segments {
        let segment = segment.as_ref();
        validate_component(segment)?;
        push_component(&mut key, segment);
    }

    Ok(key)
}

/// Splits a store key back into its index name and segments.
///
/// # Errors
///
/// Returns [`CodecError::MalformedKey`] if the key lacks the namespace
/// marker, contains an invalid escape, ends inside a component, or has an
/// empty index name.
pub fn split_composite_key(key: &str) -> CodecResult<(String, Vec<String>)> {
    let body = key
        .strip_prefix(NAMESPACE)
        .ok_or_else(|| CodecError::malformed_key("missing namespace marker"))?;

    let mut components = Vec::new();
    let mut current = String::new();
    let mut open = false;
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        match c {
            TERMINATOR => {
                components.push(std::mem::take(&mut current));
                open = false;
            }
            ESCAPE => {
                match chars.next() {
                    Some('\u{1}') => current.push('\u{0}'),
                    Some('\u{2}') => current.push('\u{1}'),
                    Some(other) => {
                        return Err(CodecError::malformed_key(format!(
                            "invalid escape sequence U+0001 U+{:04X}",
                            u32::from(other)
                        )))
                    }
                    None => return Err(CodecError::malformed_key("dangling escape at end of key")),
                }
                open = true;
            }
            other => {
                current.push(other);
                open = true;
            }
        }
    }

    if open {
        return Err(CodecError::malformed_key("unterminated component"));
    }

    let mut components = components.into_iter();
    let index_name = match components.next() {
        Some(name) if !name.is_empty() => name,
        _ => return Err(CodecError::malformed_key("missing index name")),
    };

    Ok((index_name, components.collect()))
}

/// Returns `[start, end)` bounds covering every key of `index_name` whose
/// segments start with `prefix`.
///
/// # Errors
///
/// Same as [`create_composite_key`].
pub fn partial_key_range<S: AsRef<str>>(index_name: &str, prefix: &[S]) -> CodecResult<(String, String)> {
    let start = create_composite_key(index_name, prefix)?;
    let mut end = start.clone();
    end.push(MAX_UNICODE_RUNE);
    Ok((start, end))
}

/// Returns true if `key` is in the composite key namespace.
#[must_use]
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(NAMESPACE)
}

fn validate_component(component: &str) -> CodecResult<()> {
    if component.contains(MAX_UNICODE_RUNE) {
        return Err(CodecError::invalid_segment(
            component,
            "U+10FFFF is reserved as the range scan upper bound",
        ));
    }
    Ok(())
}

fn push_component(key: &mut String, component: &str) {
    for c in component.chars() {
        match c {
            '\u{0}' => key.push_str("\u{1}\u{1}"),
            '\u{1}' => key.push_str("\u{1}\u{2}"),
            other => key.push(other),
        }
    }
    key.push(TERMINATOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const INDEX: &str = "color~name";

    #[test]
    fn layout_matches_documented_format() {
        let key = create_composite_key(INDEX, &["blue", "m1"]).unwrap();
        assert_eq!(key, "\u{0}color~name\u{0}blue\u{0}m1\u{0}");
    }

    #[test]
    fn roundtrip_with_control_characters_and_separators() {
        let segments = vec!["a\u{0}b".to_string(), "\u{1}".to_string(), "x~y".to_string(), String::new()];
        let key = create_composite_key(INDEX, &segments).unwrap();
        let (index, decoded) = split_composite_key(&key).unwrap();
        assert_eq!(index, INDEX);
        assert_eq!(decoded, segments);
    }

    #[test]
    fn embedded_separator_does_not_collide() {
        let a = create_composite_key(INDEX, &["a\u{0}b", "c"]).unwrap();
        let b = create_composite_key(INDEX, &["a", "b\u{0}c"]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn composite_key_struct_roundtrip() {
        let key = CompositeKey::new(INDEX, ["red", "m7"]);
        let encoded = key.encode().unwrap();
        assert_eq!(CompositeKey::decode(&encoded).unwrap(), key);
        assert!(is_composite_key(&encoded));
        assert!(!is_composite_key("m7"));
    }

    #[test]
    fn no_segments_is_valid() {
        let key = create_composite_key::<&str>(INDEX, &[]).unwrap();
        let (index, segments) = split_composite_key(&key).unwrap();
        assert_eq!(index, INDEX);
        assert!(segments.is_empty());
    }

    #[test]
    fn rejects_reserved_character() {
        let result = create_composite_key(INDEX, &["blue\u{10FFFF}"]);
        assert!(matches!(result, Err(CodecError::InvalidSegment { .. })));
        let result = create_composite_key::<&str>("idx\u{10FFFF}", &[]);
        assert!(matches!(result, Err(CodecError::InvalidSegment { .. })));
    }

    #[test]
    fn rejects_empty_index_name() {
        assert_eq!(
            create_composite_key("", &["a"]),
            Err(CodecError::EmptyIndexName)
        );
    }

    #[test]
    fn split_rejects_malformed_keys() {
        for bad in [
            "plain",
            "\u{0}",
            "\u{0}\u{0}",
            "\u{0}idx",
            "\u{0}idx\u{0}seg",
            "\u{0}idx\u{0}a\u{1}",
            "\u{0}idx\u{0}a\u{1}x\u{0}",
        ] {
            assert!(
                matches!(split_composite_key(bad), Err(CodecError::MalformedKey { .. })),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn partial_range_selects_exactly_the_prefix() {
        let (start, end) = partial_key_range(INDEX, &["blue"]).unwrap();
        let inside = [
            create_composite_key(INDEX, &["blue", "m1"]).unwrap(),
            create_composite_key(INDEX, &["blue", ""]).unwrap(),
            create_composite_key(INDEX, &["blue", "\u{10FFFE}"]).unwrap(),
        ];
        let outside = [
            create_composite_key(INDEX, &["blu", "m1"]).unwrap(),
            create_composite_key(INDEX, &["blue2", "m1"]).unwrap(),
            create_composite_key(INDEX, &["blue\u{0}", "m1"]).unwrap(),
            create_composite_key("size~name", &["blue", "m1"]).unwrap(),
            "blue".to_string(),
        ];
        for key in &inside {
            assert!(&start <= key && key < &end, "{key:?} should be inside");
        }
        for key in &outside {
            assert!(!(&start <= key && key < &end), "{key:?} should be outside");
        }
    }

    #[test]
    fn composite_keys_sort_before_plain_keys() {
        let key = create_composite_key(INDEX, &["blue", "m1"]).unwrap();
        assert!(key.as_str() < "\u{1}");
        assert!(key.as_str() < "m1");
    }

    fn component() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                Just('\u{0}'),
                Just('\u{1}'),
                Just('\u{2}'),
                Just('~'),
                prop::char::range('a', 'e'),
                prop::char::range('\u{e000}', '\u{e002}'),
            ],
            0..6,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        #[test]
        fn encoded_order_matches_tuple_order(
            a in prop::collection::vec(component(), 0..4),
            b in prop::collection::vec(component(), 0..4),
        ) {
            let ka = create_composite_key(INDEX, &a).unwrap();
            let kb = create_composite_key(INDEX, &b).unwrap();
            prop_assert_eq!(ka.as_bytes().cmp(kb.as_bytes()), a.cmp(&b));
        }

        #[test]
        fn split_inverts_create(segments in prop::collection::vec(component(), 0..5)) {
            let key = create_composite_key(INDEX, &segments).unwrap();
            let (index, decoded) = split_composite_key(&key).unwrap();
            prop_assert_eq!(index, INDEX);
            prop_assert_eq!(decoded, segments);
        }
    }
}
