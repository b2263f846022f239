//! Vigil lineage verification -- provenance checks for incoming documents.
//!
//! A document's lineage is the provenance metadata attached to it: a declared
//! content hash and, for documents from a declared source identity, an
//! ed25519 signature over the content digest. The [`LineageVerifier`]
//! recomputes the hash, validates the signature against a trusted
//! [`KeyStore`], and produces an immutable [`LineageRecord`] -- it never
//! raises on malformed input; bad hashes and signatures resolve to a failed
//! record.

pub mod hash;
pub mod keys;
pub mod record;
pub mod signer;
pub mod verify;

pub use keys::{KeyStore, StaticKeyStore};
pub use record::{Document, LineageFailureKind, LineageRecord};
pub use verify::LineageVerifier;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Top-level error type for the vigil-lineage crate.
///
/// Verification itself is infallible by design (it returns a failed record,
/// not an error); errors only arise when building the trusted key store.
#[derive(Debug, thiserror::Error)]
pub enum LineageError {
    /// A configured trusted key could not be decoded.
    #[error("invalid trusted key for '{identity}': {reason}")]
    InvalidKey { identity: String, reason: String },
}
