//! Provenance signing helpers.
//!
//! The signing side of the scheme the [`crate::LineageVerifier`] checks:
//! an ed25519 signature over the SHA-256 digest of the raw content, carried
//! as base64. Production sources sign in their own infrastructure; this
//! module exists for the simulation CLI and for tests.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

use crate::hash::content_digest;

/// Signs document content, returning the base64 signature the
/// [`crate::Document::signature`] field carries.
#[must_use]
pub fn sign_content(key: &SigningKey, content: &[u8]) -> String {
    let digest = content_digest(content);
    let signature = key.sign(&digest);
    BASE64.encode(signature.to_bytes())
}

/// Renders a verifying key in the base64 form the trusted-keys
/// configuration expects.
#[must_use]
pub fn verifying_key_base64(key: &VerifyingKey) -> String {
    BASE64.encode(key.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
