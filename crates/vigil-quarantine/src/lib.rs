//! Vigil quarantine store -- immutable evidence bundles for blocked documents.
//!
//! When the pipeline blocks a document, the document itself, the verifier
//! evidence that caused the block, and the decision metadata are packed into
//! a write-once gzip-compressed tar archive with a checksum manifest. A
//! quarantined document is preserved, not discarded: the bundle is the
//! forensic record of *why* it was stopped.

pub mod bundle;
pub mod store;

pub use bundle::{
    verify_bundle_archive, BundleManifest, EvidenceBundle, EvidenceBundleBuilder,
    BUNDLE_SCHEMA_VERSION,
};
pub use store::QuarantineStore;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Top-level error type for the vigil-quarantine crate.
#[derive(Debug, thiserror::Error)]
pub enum QuarantineError {
    /// An I/O error occurred while writing or reading a bundle.
    #[error("I/O error: {0}")]
    Io(String),

    /// A bundle component could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A required bundle component was not provided.
    #[error("missing bundle field: {0}")]
    MissingField(String),

    /// A bundle with this identifier already exists and `force` was not set.
    #[error("evidence bundle '{bundle_id}' already exists; refusing to overwrite")]
    BundleExists { bundle_id: String },

    /// An archive failed checksum or completeness verification.
    #[error("bundle integrity violation: {0}")]
    IntegrityViolation(String),
}
