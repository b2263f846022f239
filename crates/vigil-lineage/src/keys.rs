//! Trusted key store for source identities.
//!
//! Signatures are validated against ed25519 public keys registered for a
//! source identity. Keys arrive from configuration as base64 strings; the
//! [`StaticKeyStore`] decodes them up front so that a bad key is a
//! configuration error, not a per-document verification failure.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::VerifyingKey;
use tracing::debug;

use crate::LineageError;

/// Lookup of trusted public keys by source identity.
///
/// The key store is an external collaborator of the verifier; production
/// deployments back it with a vault or KMS, tests and the bundled CLI use
/// [`StaticKeyStore`].
pub trait KeyStore: Send + Sync {
    /// Returns the trusted public key for `identity`, if one is registered.
    fn lookup(&self, identity: &str) -> Option<VerifyingKey>;
}

/// In-memory key store built from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyStore {
    keys: BTreeMap<String, VerifyingKey>,
}

impl StaticKeyStore {
    /// Creates an empty key store (no identity is trusted).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a trusted key for an identity, replacing any previous one.
    pub fn insert(&mut self, identity: impl Into<String>, key: VerifyingKey) {
        self.keys.insert(identity.into(), key);
    }

    /// Builds a key store from `identity -> base64 ed25519 public key`
    /// configuration entries.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::InvalidKey`] for entries that are not valid
    /// base64 or do not decode to a 32-byte ed25519 public key.
    pub fn from_base64(entries: &BTreeMap<String, String>) -> Result<Self, LineageError> {
        let mut store = Self::new();
        for (identity, encoded) in entries {
            let bytes = BASE64.decode(encoded).map_err(|e| LineageError::InvalidKey {
                identity: identity.clone(),
                reason: format!("bad base64: {e}"),
            })?;

            let arr: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| LineageError::InvalidKey {
                    identity: identity.clone(),
                    reason: format!("expected 32 bytes, got {}", bytes.len()),
                })?;

            let key = VerifyingKey::from_bytes(&arr).map_err(|e| LineageError::InvalidKey {
                identity: identity.clone(),
                reason: format!("bad ed25519 key: {e}"),
            })?;

            store.insert(identity.clone(), key);
        }
        debug!(identities = store.keys.len(), "trusted key store built");
        Ok(store)
    }

    /// Number of registered identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` when no identity is trusted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyStore for StaticKeyStore {
    fn lookup(&self, identity: &str) -> Option<VerifyingKey> {
        self.keys.get(identity).copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn test_key() -> VerifyingKey {
        SigningKey::from_bytes(&[7u8; 32]).verifying_key()
    }

    #[test]
    fn lookup_registered_identity() {
        let mut store = StaticKeyStore::new();
        store.insert("security-team", test_key());

        assert!(store.lookup("security-team").is_some());
        assert!(store.lookup("unknown").is_none());
    }

    #[test]
    fn from_base64_round_trip() {
        let key = test_key();
        let mut entries = BTreeMap::new();
        entries.insert(
            "security-team".to_string(),
            BASE64.encode(key.as_bytes()),
        );

        let store = StaticKeyStore::from_base64(&entries).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("security-team"), Some(key));
    }

    #[test]
    fn from_base64_rejects_garbage() {
        let mut entries = BTreeMap::new();
        entries.insert("broken".to_string(), "not base64 !!!".to_string());

        let result = StaticKeyStore::from_base64(&entries);
        assert!(matches!(result, Err(LineageError::InvalidKey { .. })));
    }

    #[test]
    fn from_base64_rejects_wrong_length() {
        let mut entries = BTreeMap::new();
        entries.insert("short".to_string(), BASE64.encode([1u8; 16]));

        let result = StaticKeyStore::from_base64(&entries);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
    }
}
