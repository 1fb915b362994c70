//! Word count, the canonical MapReduce application

use super::types::KeyValue;

/// Sample inputs used when no files are given
pub const DEMO_INPUTS: [&str; 4] = [
    "foo bar baz foo",
    "bar baz qux",
    "foo qux qux qux",
    "lorem ipsum dolor sit amet",
];

/// Emit `(word, "1")` for every whitespace-separated word, lowercased
pub fn word_count_map(_doc_id: &str, contents: &str) -> Vec<KeyValue> {
    contents
        .split_whitespace()
        .map(|word| KeyValue::new(word.to_lowercase(), "1"))
        .collect()
}

/// Number of occurrences of `key`
pub fn word_count_reduce(_key: &str, values: &[String]) -> String {
    values.len().to_string()
}
