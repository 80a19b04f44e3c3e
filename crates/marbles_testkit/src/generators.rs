//! Property-based test generators using proptest.
//!
//! Provides strategies for generating registry inputs that satisfy the
//! validation rules, plus raw key segments that exercise the codec's
//! escaping.

use marbles_core::CreateMarble;
use proptest::prelude::*;

/// Strategy for marble names.
pub fn marble_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,15}").expect("Invalid regex")
}

/// Strategy for colors, including a few near-collisions.
pub fn color_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("blue".to_string()),
        Just("bluegreen".to_string()),
        Just("red".to_string()),
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
    ]
}

/// Strategy for owner names, lower-case so owner queries find them.
pub fn owner_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,10}").expect("Invalid regex")
}

/// Strategy for valid create inputs.
pub fn create_marble_strategy() -> impl Strategy<Value = CreateMarble> {
    (
        marble_name_strategy(),
        color_strategy(),
        1..1_000i64,
        owner_strategy(),
        1..1_000_000i64,
    )
        .prop_map(|(name, color, size, owner, price)| CreateMarble {
            name,
            color,
            size,
            owner,
            price,
        })
}

/// Strategy for composite key segments, weighted toward the separator and
/// escape characters.
pub fn key_segment_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            3 => prop::char::range('a', 'z'),
            1 => Just('\u{0}'),
            1 => Just('\u{1}'),
            1 => Just('\u{2}'),
            1 => Just('~'),
            1 => prop::char::range('\u{e9}', '\u{ff}'),
        ],
        0..8,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// Strategy for distinct sets of create inputs.
pub fn marble_set_strategy(max: usize) -> impl Strategy<Value = Vec<CreateMarble>> {
    prop::collection::vec(create_marble_strategy(), 1..=max).prop_map(|mut inputs| {
        inputs.sort_by(|a, b| a.name.cmp(&b.name));
        inputs.dedup_by(|a, b| a.name == b.name);
        inputs
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use marbles_core::TransientInput;

    proptest! {
        #[test]
        fn generated_inputs_validate(input in create_marble_strategy()) {
            prop_assert!(input.validate().is_ok());
        }

        #[test]
        fn marble_sets_have_unique_names(inputs in marble_set_strategy(8)) {
            let mut names: Vec<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
            names.dedup();
            prop_assert_eq!(names.len(), inputs.len());
        }
    }
}
