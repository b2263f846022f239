//! Lineage verification.
//!
//! Verification is pure given the document and the key store state: it
//! recomputes the content hash, evaluates the signature policy, and returns
//! a [`LineageRecord`]. Malformed declared hashes or signatures resolve to a
//! failed record -- never a panic, never an error return.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::{debug, warn};

use crate::hash::{content_digest, content_hash, hashes_match};
use crate::keys::KeyStore;
use crate::record::{Document, LineageFailureKind, LineageRecord};

// ---------------------------------------------------------------------------
// LineageVerifier
// ---------------------------------------------------------------------------

/// Verifier for document provenance claims.
pub struct LineageVerifier {
    keys: Box<dyn KeyStore>,
}

impl LineageVerifier {
    /// Creates a verifier over the given trusted key store.
    #[must_use]
    pub fn new(keys: Box<dyn KeyStore>) -> Self {
        Self { keys }
    }

    /// Verifies one document, producing its lineage record.
    ///
    /// # Hash check
    ///
    /// The SHA-256 of `content` is recomputed and compared with
    /// `declared_hash`. An absent declared hash counts as a mismatch.
    ///
    /// # Signature policy
    ///
    /// | `source_identity` | `signature` | result                               |
    /// |-------------------|-------------|--------------------------------------|
    /// | declared, trusted | present     | ed25519 verification over the digest |
    /// | declared          | absent      | invalid (signature is mandatory)     |
    /// | declared, unknown | present     | invalid (no trusted key)             |
    /// | absent            | present     | invalid (nothing to validate against)|
    /// | absent            | absent      | valid (absent-as-allowed)            |
    pub fn verify(&self, document: &Document) -> LineageRecord {
        let computed_hash = content_hash(&document.content);

        let hash_match = match document.declared_hash.as_deref() {
            Some(declared) => hashes_match(declared, &computed_hash),
            None => false,
        };

        let signature_valid = self.signature_valid(document);

        if !hash_match || !signature_valid {
            warn!(
                document_id = %document.id,
                hash_match,
                signature_valid,
                "lineage verification failed"
            );
        } else {
            debug!(document_id = %document.id, "lineage verified");
        }

        LineageRecord {
            document_id: document.id.clone(),
            computed_hash,
            hash_match,
            signature_valid,
            verified_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }

    fn signature_valid(&self, document: &Document) -> bool {
        match (&document.source_identity, &document.signature) {
            (Some(identity), Some(signature)) => match self.keys.lookup(identity) {
                Some(key) => verify_signature(&key, &document.content, signature),
                None => {
                    warn!(document_id = %document.id, identity = %identity, "no trusted key for identity");
                    false
                }
            },
            // A declared identity makes the signature mandatory.
            (Some(_), None) => false,
            // A signature with no identity cannot be validated against anyone.
            (None, Some(_)) => false,
            (None, None) => true,
        }
    }
}

/// Classifies a failed record into the blocking failure kind.
///
/// Returns `None` when the record passed. Hash integrity is checked before
/// signature state, matching the verification order.
#[must_use]
pub fn failure_kind(document: &Document, record: &LineageRecord) -> Option<LineageFailureKind> {
    if !record.hash_match {
        return Some(LineageFailureKind::HashMismatch);
    }
    if !record.signature_valid {
        return Some(if document.signature.is_none() {
            LineageFailureKind::MissingSignature
        } else {
            LineageFailureKind::SignatureInvalid
        });
    }
    None
}

/// Verifies a base64 ed25519 signature over the content digest.
///
/// Malformed base64 or signature bytes resolve to `false`.
fn verify_signature(key: &VerifyingKey, content: &[u8], signature_b64: &str) -> bool {
    let sig_bytes = match BASE64.decode(signature_b64) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature = match Signature::from_slice(&sig_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    key.verify(&content_digest(content), &signature).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
