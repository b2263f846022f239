//! Content hashing helpers.
//!
//! All hashes in Vigil are rendered as `sha256:<lowercase hex>`. Declared
//! hashes arriving from outside may omit the prefix or use uppercase hex;
//! comparison is tolerant of both.

use sha2::{Digest, Sha256};

/// Prefix carried by every rendered hash.
pub const HASH_PREFIX: &str = "sha256:";

/// Computes the SHA-256 content hash of raw document bytes.
#[must_use]
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{HASH_PREFIX}{}", hex::encode(hasher.finalize()))
}

/// Raw SHA-256 digest of document content, as signed by provenance keys.
#[must_use]
pub fn content_digest(content: &[u8]) -> [u8; 32] {
    Sha256::digest(content).into()
}

/// Compares a declared hash against a computed one.
///
/// The declared side may omit the `sha256:` prefix and may use uppercase
/// hex; anything else must match exactly.
#[must_use]
pub fn hashes_match(declared: &str, computed: &str) -> bool {
    let declared = declared.strip_prefix(HASH_PREFIX).unwrap_or(declared);
    let computed = computed.strip_prefix(HASH_PREFIX).unwrap_or(computed);
    declared.eq_ignore_ascii_case(computed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_known_value() {
        // SHA-256("hello") = 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
        assert_eq!(
            content_hash(b"hello"),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn digest_matches_hash() {
        let digest = content_digest(b"hello");
        assert_eq!(
            format!("sha256:{}", hex::encode(digest)),
            content_hash(b"hello")
        );
    }

    #[test]
    fn match_tolerates_missing_prefix() {
        let computed = content_hash(b"doc");
        let bare = computed.strip_prefix("sha256:").unwrap();
        assert!(hashes_match(bare, &computed));
    }

    #[test]
    fn match_tolerates_uppercase() {
        let computed = content_hash(b"doc");
        assert!(hashes_match(&computed.to_uppercase(), &computed));
    }

    #[test]
    fn single_byte_difference_mismatches() {
        let computed = content_hash(b"doc");
        let mut altered = computed.clone().into_bytes();
        // Flip one hex character of the digest.
        let last = altered.len() - 1;
        altered[last] = if altered[last] == b'0' { b'1' } else { b'0' };
        let altered = String::from_utf8(altered).unwrap();
        assert!(!hashes_match(&altered, &computed));
    }
}
