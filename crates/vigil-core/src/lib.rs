//! Vigil Core -- shared types, configuration, and pipeline orchestration.
//!
//! This crate defines the admission decision taxonomy used throughout the
//! Vigil document-admission pipeline, the top-level error type, structured
//! tracing setup, and the [`engine::AdmissionPipeline`] that sequences
//! lineage verification, semantic scanning, quarantine, and audit logging.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod engine;

// Re-exported so downstream crates name one type source.
pub use vigil_lineage::{Document, LineageFailureKind, LineageRecord};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Top-level error type for the vigil-core crate.
///
/// Block decisions are *values* ([`Decision::Quarantined`]), never errors;
/// this enum covers processing faults only.
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Trusted-key configuration could not be loaded.
    #[error("lineage error: {0}")]
    Lineage(#[from] vigil_lineage::LineageError),

    /// Semantic scoring rejected an input.
    #[error("semantic error: {0}")]
    Semantic(#[from] vigil_semantic::SemanticError),

    /// The embedding provider failed or timed out. The document is held for
    /// retry by the caller -- it is never silently accepted.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A quarantine or audit write failed. Fatal for the document's run; the
    /// document must not advance to done.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Invariant breakage inside the pipeline (e.g. a poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),

    /// Tracing/logging initialization failed.
    #[error("tracing initialization error: {0}")]
    TracingInit(String),
}

/// Convenience alias for `Result<T, VigilError>`.
pub type VigilResult<T> = Result<T, VigilError>;

// ---------------------------------------------------------------------------
// Tracing / Logging
// ---------------------------------------------------------------------------

/// Initialize structured tracing with the given verbosity level.
///
/// | `verbose` | `quiet` | `json_output` | Effect                            |
/// |-----------|---------|---------------|-----------------------------------|
/// | `true`    | _       | _             | TRACE level (most verbose)        |
/// | _         | `true`  | _             | ERROR level only                  |
/// | `false`   | `false` | _             | INFO level (default)              |
/// | _         | _       | `true`        | JSON-formatted log lines (CI/CD)  |
/// | _         | _       | `false`       | Human-readable, compact log lines |
///
/// `RUST_LOG`, when set, takes precedence over the programmatic level so
/// operators can fine-tune per-module verbosity without recompiling.
///
/// # Errors
///
/// Returns [`VigilError::TracingInit`] if the global subscriber has already
/// been set.
pub fn init_tracing(verbose: bool, quiet: bool, json_output: bool) -> Result<(), VigilError> {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose {
        "trace"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_output {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
            .map_err(|e| VigilError::TracingInit(e.to_string()))
    } else {
        fmt()
            .compact()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
            .map_err(|e| VigilError::TracingInit(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// BlockReason
// ---------------------------------------------------------------------------

/// Why a document was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Provenance verification failed.
    Lineage(LineageFailureKind),
    /// The semantic anomaly score crossed the threshold.
    Semantic,
}

impl BlockReason {
    /// Human-readable reason recorded in the evidence bundle.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Lineage(kind) => format!("lineage verification failed: {kind}"),
            Self::Semantic => "semantic anomaly detected".to_string(),
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Final admission decision for one document. Produced exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The document may proceed toward downstream indexing.
    Accepted,
    /// The document was blocked and its evidence bundled.
    Quarantined(BlockReason),
}

impl Decision {
    /// Stable label used in the audit log and evidence bundles.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Quarantined(BlockReason::Lineage(_)) => "quarantined_lineage",
            Self::Quarantined(BlockReason::Semantic) => "quarantined_semantic",
        }
    }

    /// `true` when the decision blocks the document.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Quarantined(_))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
