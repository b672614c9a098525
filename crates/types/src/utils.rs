//! Canonicalization helpers shared by the builders

use figment::value::Value;
use unicode_normalization::UnicodeNormalization;

/// Prefix of names reserved for introspection and debugging probes
pub const RESERVED_PREFIX: &str = "__";

/// Whether an attribute name is reserved and must never become a key
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Canonical form of a three-level key: NFC, upper case
pub fn canonical_key(name: &str) -> String {
    let normalized: String = name.nfc().collect();
    normalized.to_uppercase()
}

/// Canonical form of a text value
pub fn canonical_text(text: &str) -> String {
    text.nfc().collect()
}

/// Canonicalize a single argument.
///
/// Only text is touched; numbers, arrays and dicts pass through as given.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::String(tag, text) => Value::String(tag, canonical_text(&text)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved("__class__"));
        assert!(is_reserved("__"));
        assert!(!is_reserved("_private"));
        assert!(!is_reserved("db"));
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("database"), "DATABASE");
        assert_eq!(canonical_key("Max_Conn"), "MAX_CONN");
        // decomposed e + combining acute
        assert_eq!(canonical_key("cafe\u{0301}"), "CAF\u{00C9}");
    }

    #[test]
    fn test_canonicalize_text_only() {
        let text = canonicalize(Value::from("cafe\u{0301}"));
        assert_eq!(text.as_str(), Some("caf\u{00e9}"));

        let number = canonicalize(Value::from(5432));
        assert_eq!(number, Value::from(5432));

        let list = Value::from(vec!["cafe\u{0301}"]);
        assert_eq!(canonicalize(list.clone()), list);
    }
}
