use serde_json::Value;
use sha2::{Digest, Sha256};

/// Order-independent SHA-256 digest over a list of JSON-serializable values.
///
/// Each value is serialized, the serializations are sorted lexicographically
/// and joined with a single space, and the SHA-256 of the joined bytes is
/// returned as lowercase hex. Mining and verification build their argument
/// lists in different call shapes; sorting makes both produce the same digest
/// for the same logical content.
pub fn crypto_hash(inputs: &[Value]) -> String {
    let mut parts: Vec<String> = inputs.iter().map(|v| v.to_string()).collect();
    parts.sort();

    let mut hasher = Sha256::new();
    hasher.update(parts.join(" ").as_bytes());
    hex::encode(hasher.finalize())
}

/// Expand a hex digest into its binary string form, 4 bits per character.
/// Callers only feed this `crypto_hash` output; a non-hex character is a
/// caller bug and trips a debug assertion (release builds skip it).
pub fn hex_to_binary(hex: &str) -> String {
    let mut out = String::with_capacity(hex.len() * 4);
    for c in hex.chars() {
        let value = c.to_digit(16);
        debug_assert!(value.is_some(), "non-hex character {c:?} in digest");
        if let Some(value) = value {
            out.push_str(&format!("{value:04b}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn crypto_hash_is_deterministic() {
        let a = crypto_hash(&[json!("foo"), json!(42)]);
        let b = crypto_hash(&[json!("foo"), json!(42)]);
        assert_eq!(a, b);
    }

    #[test]
    fn crypto_hash_is_order_independent() {
        let a = crypto_hash(&[json!("one"), json!("two"), json!("three")]);
        let b = crypto_hash(&[json!("three"), json!("one"), json!("two")]);
        assert_eq!(a, b);
    }

    #[test]
    fn crypto_hash_changes_with_input() {
        let a = crypto_hash(&[json!("foo")]);
        let b = crypto_hash(&[json!("bar")]);
        assert_ne!(a, b);
    }

    #[test]
    fn crypto_hash_is_lowercase_hex() {
        let digest = crypto_hash(&[json!("foo")]);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hex_to_binary_expands_each_character() {
        assert_eq!(hex_to_binary("0"), "0000");
        assert_eq!(hex_to_binary("f"), "1111");
        assert_eq!(hex_to_binary("a1"), "10100001");
    }

    #[test]
    #[should_panic(expected = "non-hex character")]
    fn hex_to_binary_rejects_non_hex_input() {
        hex_to_binary("zz");
    }
}
