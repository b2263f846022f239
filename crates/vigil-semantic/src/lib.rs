//! Vigil semantic anomaly scoring.
//!
//! Scores a document's embedding against two anchors: a fixed baseline
//! reference set (drift from trusted content) and the centroid of previously
//! *accepted* documents (drift from the admitted corpus). Quarantined
//! documents never feed back into the cluster, so a rejected document cannot
//! poison the baseline for the ones after it.
//!
//! The embedding model itself is an external collaborator behind the
//! [`TextEmbedder`] trait; [`HashEmbedder`] is the bundled deterministic
//! offline implementation.

pub mod embedder;
pub mod math;
pub mod scanner;

pub use embedder::{embed_with_timeout, HashEmbedder, TextEmbedder};
pub use math::MathError;
pub use scanner::{ScoringConfig, SemanticScanner, SemanticScore};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Top-level error type for the vigil-semantic crate.
#[derive(Debug, thiserror::Error)]
pub enum SemanticError {
    /// Vector math rejected an input (zero vector, NaN/Inf).
    #[error("vector math error: {0}")]
    Math(#[from] MathError),

    /// An embedding did not match the scanner's configured dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The scanner was constructed without any baseline reference.
    #[error("baseline reference set is empty")]
    EmptyBaseline,

    /// The embedding provider reported a failure.
    #[error("embedding provider failed: {0}")]
    EmbeddingFailed(String),

    /// The embedding provider did not answer within the configured bound.
    #[error("embedding provider timed out after {ms}ms")]
    EmbeddingTimeout { ms: u64 },
}
