//! Topic routing-pattern matching.

/// Whether a binding `pattern` accepts `routing_key`.
///
/// Both are dot-separated words. `*` in the pattern matches exactly one word,
/// `#` matches zero or more words; any other word must match literally.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches_words(&pattern, &key)
}

fn matches_words(pattern: &[&str], key: &[&str]) -> bool {
    match (pattern.split_first(), key.split_first()) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some((&"#", rest)), _) => {
            matches_words(rest, key) || (!key.is_empty() && matches_words(pattern, &key[1..]))
        }
        (Some(_), None) => false,
        (Some((&"*", rest)), Some((_, key_rest))) => matches_words(rest, key_rest),
        (Some((word, rest)), Some((key_word, key_rest))) => {
            word == key_word && matches_words(rest, key_rest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_matches_only_itself() {
        assert!(topic_matches("inventory.low-stock", "inventory.low-stock"));
        assert!(!topic_matches("inventory.low-stock", "inventory.out-of-stock"));
        assert!(!topic_matches("inventory.low-stock", "inventory.low-stock.extra"));
    }

    #[test]
    fn star_matches_exactly_one_word() {
        assert!(topic_matches("inventory.*", "inventory.low-stock"));
        assert!(topic_matches("promotion.*", "promotion.ended"));
        assert!(!topic_matches("inventory.*", "inventory"));
        assert!(!topic_matches("loyalty.*", "loyalty.points.earned"));
    }

    #[test]
    fn hash_matches_zero_or_more_words() {
        assert!(topic_matches("#", "finance.decision"));
        assert!(topic_matches("loyalty.#", "loyalty.points.earned"));
        assert!(topic_matches("loyalty.#", "loyalty"));
        assert!(topic_matches("#.changed", "price.changed"));
        assert!(topic_matches("#.changed", "loyalty.tier.changed"));
        assert!(!topic_matches("price.#", "promotion.started"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn word() -> impl Strategy<Value = String> {
            "[a-z][a-z-]{0,8}"
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            #[test]
            fn every_key_matches_itself_and_hash(words in prop::collection::vec(word(), 1..5)) {
                let key = words.join(".");
                prop_assert!(topic_matches(&key, &key));
                prop_assert!(topic_matches("#", &key));
            }

            #[test]
            fn star_per_word_matches_same_length_only(words in prop::collection::vec(word(), 1..5)) {
                let key = words.join(".");
                let stars = vec!["*"; words.len()].join(".");
                prop_assert!(topic_matches(&stars, &key));

                let longer = format!("{stars}.*");
                prop_assert!(!topic_matches(&longer, &key));
            }
        }
    }
}
