//! Embedding provider seam.
//!
//! The pipeline consumes embeddings through the [`TextEmbedder`] trait and
//! never sees the model behind it. Implementations must be deterministic for
//! identical input text and model version. [`HashEmbedder`] is the bundled
//! offline implementation: it derives a pseudo-embedding from SHA-256, which
//! keeps simulations and tests fully reproducible with no model on disk.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::math::l2_normalized;
use crate::SemanticError;

// ---------------------------------------------------------------------------
// TextEmbedder
// ---------------------------------------------------------------------------

/// Maps document text to a fixed-dimension L2-normalized vector.
pub trait TextEmbedder: Send + Sync {
    /// Embeds one text. Must be deterministic for identical input.
    fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError>;

    /// The fixed output dimension.
    fn dim(&self) -> usize;
}

// ---------------------------------------------------------------------------
// HashEmbedder
// ---------------------------------------------------------------------------

/// Deterministic SHA-256-driven embedder.
///
/// Each component is derived from `SHA-256(text || block_index)`, mapped to
/// a value centered on zero, and the whole vector is L2-normalized. Texts
/// that differ in any byte land in effectively independent directions, while
/// identical texts always produce the identical vector -- which is exactly
/// the contract the scoring layer needs for offline operation.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    /// Creates an embedder with the given output dimension (must be > 0).
    pub fn new(dim: usize) -> Result<Self, SemanticError> {
        if dim == 0 {
            return Err(SemanticError::EmbeddingFailed(
                "embedding dimension must be non-zero".to_string(),
            ));
        }
        Ok(Self { dim })
    }
}

impl TextEmbedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let mut components = Vec::with_capacity(self.dim);
        let mut block: u64 = 0;
        while components.len() < self.dim {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(block.to_le_bytes());
            let digest = hasher.finalize();

            for chunk in digest.chunks_exact(4) {
                if components.len() == self.dim {
                    break;
                }
                let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                // Center on zero so components carry sign.
                let value = (f64::from(raw) / f64::from(u32::MAX)) - 0.5;
                components.push(value as f32);
            }
            block += 1;
        }

        let normalized = l2_normalized(&components)?;
        Ok(normalized)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

// ---------------------------------------------------------------------------
// Timeout bounding
// ---------------------------------------------------------------------------

/// Runs `embedder.embed(text)` with a caller-supplied time bound.
///
/// The provider call runs on a worker thread; if it does not answer within
/// `timeout` the call resolves to [`SemanticError::EmbeddingTimeout`] and the
/// straggling worker result is discarded when it eventually arrives. A
/// timeout is a processing fault for the document -- the pipeline holds it
/// for retry, never silently accepts it.
pub fn embed_with_timeout(
    embedder: &Arc<dyn TextEmbedder>,
    text: &str,
    timeout: Duration,
) -> Result<Vec<f32>, SemanticError> {
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(embedder);
    let owned = text.to_string();
    thread::spawn(move || {
        // The receiver may be gone after a timeout; that is fine.
        let _ = tx.send(worker.embed(&owned));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => {
            let ms = timeout.as_millis() as u64;
            warn!(ms, "embedding provider timed out");
            Err(SemanticError::EmbeddingTimeout { ms })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashEmbedder::new(32).unwrap();
        assert_eq!(
            embedder.embed("hello world").unwrap(),
            embedder.embed("hello world").unwrap()
        );
    }

    #[test]
    fn different_texts_embed_differently() {
        let embedder = HashEmbedder::new(32).unwrap();
        assert_ne!(
            embedder.embed("hello world").unwrap(),
            embedder.embed("hello world!").unwrap()
        );
    }

    #[test]
    fn embedding_is_normalized() {
        let embedder = HashEmbedder::new(48).unwrap();
        let v = embedder.embed("some document text").unwrap();
        assert_eq!(v.len(), 48);
        let norm_sq: f32 = v.iter().map(|x| x * x).sum();
        assert!((norm_sq - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_dimension_rejected() {
        assert!(HashEmbedder::new(0).is_err());
    }

    #[test]
    fn timeout_surfaces_as_error() {
        struct StuckEmbedder;
        impl TextEmbedder for StuckEmbedder {
            fn embed(&self, _text: &str) -> Result<Vec<f32>, SemanticError> {
                thread::sleep(Duration::from_secs(5));
                Ok(vec![1.0])
            }
            fn dim(&self) -> usize {
                1
            }
        }

        let embedder: Arc<dyn TextEmbedder> = Arc::new(StuckEmbedder);
        let result = embed_with_timeout(&embedder, "text", Duration::from_millis(20));
        assert!(matches!(
            result,
            Err(SemanticError::EmbeddingTimeout { ms: 20 })
        ));
    }

    #[test]
    fn fast_embedder_answers_within_bound() {
        let embedder: Arc<dyn TextEmbedder> = Arc::new(HashEmbedder::new(16).unwrap());
        let result = embed_with_timeout(&embedder, "text", Duration::from_secs(5));
        assert_eq!(result.unwrap().len(), 16);
    }

    #[test]
    fn provider_failure_propagates() {
        struct FailingEmbedder;
        impl TextEmbedder for FailingEmbedder {
            fn embed(&self, _text: &str) -> Result<Vec<f32>, SemanticError> {
                Err(SemanticError::EmbeddingFailed("model offline".to_string()))
            }
            fn dim(&self) -> usize {
                4
            }
        }

        let embedder: Arc<dyn TextEmbedder> = Arc::new(FailingEmbedder);
        let result = embed_with_timeout(&embedder, "text", Duration::from_secs(1));
        assert!(matches!(result, Err(SemanticError::EmbeddingFailed(_))));
    }
}
