//! Document and lineage record types.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// An incoming document with its attached provenance claims.
///
/// Immutable once ingested: the pipeline owns the document transiently and
/// routes it; no stage mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier for the logical document.
    pub id: String,

    /// Raw document content.
    pub content: Vec<u8>,

    /// Content hash declared by the source (`sha256:<hex>` or bare hex).
    /// Absence is treated as a hash mismatch, never as a skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_hash: Option<String>,

    /// Base64-encoded ed25519 signature over the SHA-256 content digest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Identity the source claims to be (e.g. `"security-team"`).
    /// A declared identity makes the signature mandatory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_identity: Option<String>,
}

impl Document {
    /// Creates a document with no provenance claims attached.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            declared_hash: None,
            signature: None,
            source_identity: None,
        }
    }

    /// Attaches a declared content hash.
    #[must_use]
    pub fn with_declared_hash(mut self, declared_hash: impl Into<String>) -> Self {
        self.declared_hash = Some(declared_hash.into());
        self
    }

    /// Attaches a base64 ed25519 signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Attaches a claimed source identity.
    #[must_use]
    pub fn with_source_identity(mut self, identity: impl Into<String>) -> Self {
        self.source_identity = Some(identity.into());
        self
    }
}

// ---------------------------------------------------------------------------
// LineageRecord
// ---------------------------------------------------------------------------

/// Outcome of verifying one document's lineage. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRecord {
    /// Identifier of the verified document.
    pub document_id: String,

    /// Recomputed content hash (`sha256:<hex>`).
    pub computed_hash: String,

    /// Whether the declared hash matched the recomputed one.
    pub hash_match: bool,

    /// Whether the signature policy was satisfied (valid signature, or none
    /// required and none present).
    pub signature_valid: bool,

    /// RFC 3339 timestamp of the verification.
    pub verified_at: String,
}

impl LineageRecord {
    /// `true` when both the hash and the signature checks passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.hash_match && self.signature_valid
    }
}

// ---------------------------------------------------------------------------
// LineageFailureKind
// ---------------------------------------------------------------------------

/// Why lineage verification blocked a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageFailureKind {
    /// Declared hash absent or different from the recomputed content hash.
    HashMismatch,
    /// A signature was present but could not be validated against the
    /// trusted key for the claimed identity.
    SignatureInvalid,
    /// The source identity requires a signature and none was attached.
    MissingSignature,
}

impl fmt::Display for LineageFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::HashMismatch => "hash_mismatch",
            Self::SignatureInvalid => "signature_invalid",
            Self::MissingSignature => "missing_signature",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
