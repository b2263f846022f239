//! Semantic anomaly scanner.
//!
//! Scoring model, per document embedding `e`:
//!
//! - `semantic_score`  = unit cosine distance from `e` to the baseline
//!   reference centroid.
//! - `cluster_distance` = unit cosine distance from `e` to the centroid of
//!   previously accepted documents (0.0 while the cluster is empty).
//! - `total_score` = `alpha * semantic_score + (1 - alpha) * cluster_distance`.
//! - `flagged` when `total_score >= semantic_threshold`.
//!
//! Identical embedding + identical baseline/cluster state always yields the
//! identical score. The cluster only grows on *accepted* documents, under
//! the caller's mutual-exclusion discipline, so a quarantined document never
//! perturbs scoring for later ones.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embedder::TextEmbedder;
use crate::math::{l2_normalized, unit_distance};
use crate::SemanticError;

// ---------------------------------------------------------------------------
// ScoringConfig
// ---------------------------------------------------------------------------

/// Scoring weights, passed in at scanner construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the baseline distance vs the cluster distance.
    pub alpha: f64,
    /// Total-score threshold at or above which a document is flagged.
    pub semantic_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            semantic_threshold: 0.35,
        }
    }
}

impl ScoringConfig {
    /// Blends the two component scores into the total score.
    ///
    /// Pure: `alpha * semantic_score + (1 - alpha) * cluster_distance`.
    #[must_use]
    pub fn combine(&self, semantic_score: f64, cluster_distance: f64) -> f64 {
        self.alpha * semantic_score + (1.0 - self.alpha) * cluster_distance
    }
}

// ---------------------------------------------------------------------------
// SemanticScore
// ---------------------------------------------------------------------------

/// Scoring result for one document. All components are recorded even when
/// the document is not flagged, for audit completeness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticScore {
    /// Identifier of the scored document.
    pub document_id: String,
    /// Unit cosine distance to the baseline centroid, in [0, 1].
    pub semantic_score: f64,
    /// Unit cosine distance to the accepted-cluster centroid, in [0, 1].
    pub cluster_distance: f64,
    /// Alpha-blended total score.
    pub total_score: f64,
    /// Threshold the total was compared against.
    pub threshold: f64,
    /// Whether the document was flagged as a semantic anomaly.
    pub flagged: bool,
}

// ---------------------------------------------------------------------------
// SemanticScanner
// ---------------------------------------------------------------------------

/// Anomaly scorer over a fixed baseline and a growing accepted cluster.
///
/// The accepted cluster is an explicit bounded collection owned by the
/// scanner -- never process-wide state. When the cluster is full, the oldest
/// accepted embedding is evicted first.
pub struct SemanticScanner {
    dim: usize,
    baseline_centroid: Vec<f32>,
    cluster: VecDeque<Vec<f32>>,
    cluster_capacity: usize,
    config: ScoringConfig,
}

impl SemanticScanner {
    /// Creates a scanner from pre-computed baseline reference embeddings.
    ///
    /// Each baseline embedding is normalized, and their mean is re-normalized
    /// into the baseline centroid, so distances stay on the unit interval.
    ///
    /// # Errors
    ///
    /// Rejects an empty baseline, mismatched dimensions, and degenerate
    /// vectors (zero/NaN/Inf).
    pub fn new(
        baseline_embeddings: Vec<Vec<f32>>,
        cluster_capacity: usize,
        config: ScoringConfig,
    ) -> Result<Self, SemanticError> {
        let first = baseline_embeddings.first().ok_or(SemanticError::EmptyBaseline)?;
        let dim = first.len();

        let mut normalized = Vec::with_capacity(baseline_embeddings.len());
        for embedding in &baseline_embeddings {
            if embedding.len() != dim {
                return Err(SemanticError::DimensionMismatch {
                    expected: dim,
                    got: embedding.len(),
                });
            }
            normalized.push(l2_normalized(embedding)?);
        }

        let baseline_centroid = centroid(&normalized, dim)?;
        info!(
            dim,
            references = normalized.len(),
            cluster_capacity,
            "semantic scanner initialized"
        );

        Ok(Self {
            dim,
            baseline_centroid,
            cluster: VecDeque::new(),
            cluster_capacity,
            config,
        })
    }

    /// Convenience constructor: embeds the baseline reference texts first.
    pub fn from_texts(
        embedder: &dyn TextEmbedder,
        reference_texts: &[String],
        cluster_capacity: usize,
        config: ScoringConfig,
    ) -> Result<Self, SemanticError> {
        let mut embeddings = Vec::with_capacity(reference_texts.len());
        for text in reference_texts {
            embeddings.push(embedder.embed(text)?);
        }
        Self::new(embeddings, cluster_capacity, config)
    }

    /// Embedding dimension the scanner was built for.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of accepted embeddings currently in the cluster.
    #[must_use]
    pub fn cluster_len(&self) -> usize {
        self.cluster.len()
    }

    /// Scoring configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores one document embedding against the current baseline and
    /// cluster state. Read-only: the cluster is not touched.
    pub fn scan(
        &self,
        document_id: &str,
        embedding: &[f32],
    ) -> Result<SemanticScore, SemanticError> {
        if embedding.len() != self.dim {
            return Err(SemanticError::DimensionMismatch {
                expected: self.dim,
                got: embedding.len(),
            });
        }
        let normalized = l2_normalized(embedding)?;

        let semantic_score = unit_distance(&normalized, &self.baseline_centroid)?;

        let cluster_distance = match self.cluster_centroid()? {
            Some(cluster_centroid) => unit_distance(&normalized, &cluster_centroid)?,
            // Empty cluster: first documents are judged on the baseline alone.
            None => 0.0,
        };

        let total_score = self.config.combine(semantic_score, cluster_distance);
        let flagged = total_score >= self.config.semantic_threshold;

        debug!(
            document_id,
            semantic_score, cluster_distance, total_score, flagged, "semantic scan scored"
        );

        Ok(SemanticScore {
            document_id: document_id.to_string(),
            semantic_score,
            cluster_distance,
            total_score,
            threshold: self.config.semantic_threshold,
            flagged,
        })
    }

    /// Adds an accepted document's embedding to the cluster.
    ///
    /// Only call for documents the pipeline accepted; the caller serializes
    /// these updates consistently with audit-log appends. Beyond capacity
    /// the oldest embedding is evicted.
    pub fn record_accepted(&mut self, embedding: &[f32]) -> Result<(), SemanticError> {
        if embedding.len() != self.dim {
            return Err(SemanticError::DimensionMismatch {
                expected: self.dim,
                got: embedding.len(),
            });
        }
        let normalized = l2_normalized(embedding)?;
        self.cluster.push_back(normalized);
        while self.cluster.len() > self.cluster_capacity {
            self.cluster.pop_front();
        }
        Ok(())
    }

    /// Normalized centroid of the accepted cluster, `None` when empty.
    fn cluster_centroid(&self) -> Result<Option<Vec<f32>>, SemanticError> {
        if self.cluster.is_empty() {
            return Ok(None);
        }
        let members: Vec<Vec<f32>> = self.cluster.iter().cloned().collect();
        Ok(Some(centroid(&members, self.dim)?))
    }
}

/// Normalized mean of a non-empty set of normalized vectors.
fn centroid(vectors: &[Vec<f32>], dim: usize) -> Result<Vec<f32>, SemanticError> {
    let mut mean = vec![0.0f32; dim];
    for vector in vectors {
        for (acc, component) in mean.iter_mut().zip(vector.iter()) {
            *acc += component;
        }
    }
    let count = vectors.len() as f32;
    for component in &mut mean {
        *component /= count;
    }
    Ok(l2_normalized(&mean)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Baseline pointing along the x axis.
    fn scanner_with_baseline_x(config: ScoringConfig) -> SemanticScanner {
        SemanticScanner::new(vec![vec![1.0, 0.0]], 16, config).unwrap()
    }

    #[test]
    fn combine_matches_worked_examples() {
        let config = ScoringConfig::default();
        assert!((config.combine(0.5, 0.1) - 0.34).abs() < 1e-9);
        assert!((config.combine(0.5, 0.3) - 0.42).abs() < 1e-9);
    }

    #[test]
    fn below_threshold_is_not_flagged() {
        // Baseline [1,0]; one accepted embedding [0.6,0.8]; document [0,1].
        // semantic = (1-0)/2 = 0.5; cluster = (1-0.8)/2 = 0.1; total = 0.34.
        let mut scanner = scanner_with_baseline_x(ScoringConfig::default());
        scanner.record_accepted(&[0.6, 0.8]).unwrap();

        let score = scanner.scan("doc-borderline", &[0.0, 1.0]).unwrap();
        assert!((score.semantic_score - 0.5).abs() < 1e-6);
        assert!((score.cluster_distance - 0.1).abs() < 1e-6);
        assert!((score.total_score - 0.34).abs() < 1e-6);
        assert!(!score.flagged);
    }

    #[test]
    fn at_or_above_threshold_is_flagged() {
        // Cluster member with cos 0.4 to the document: cluster distance 0.3.
        // total = 0.6*0.5 + 0.4*0.3 = 0.42 >= 0.35.
        let mut scanner = scanner_with_baseline_x(ScoringConfig::default());
        let x = (1.0f32 - 0.16).sqrt(); // so that [x, 0.4] is unit length
        scanner.record_accepted(&[x, 0.4]).unwrap();

        let score = scanner.scan("doc-anomaly", &[0.0, 1.0]).unwrap();
        assert!((score.cluster_distance - 0.3).abs() < 1e-6);
        assert!((score.total_score - 0.42).abs() < 1e-6);
        assert!(score.flagged);
    }

    #[test]
    fn exact_threshold_flags() {
        let config = ScoringConfig {
            alpha: 1.0,
            semantic_threshold: 0.5,
        };
        let scanner = scanner_with_baseline_x(config);
        // Orthogonal document: semantic = 0.5 exactly; 0.5 >= 0.5 flags.
        let score = scanner.scan("doc-edge", &[0.0, 1.0]).unwrap();
        assert!(score.flagged);
    }

    #[test]
    fn empty_cluster_contributes_zero() {
        let scanner = scanner_with_baseline_x(ScoringConfig::default());
        let score = scanner.scan("doc-first", &[0.0, 1.0]).unwrap();
        assert_eq!(score.cluster_distance, 0.0);
        assert!((score.total_score - 0.3).abs() < 1e-6);
        assert!(!score.flagged);
    }

    #[test]
    fn identical_to_baseline_scores_zero() {
        let scanner = scanner_with_baseline_x(ScoringConfig::default());
        let score = scanner.scan("doc-baseline", &[1.0, 0.0]).unwrap();
        assert!(score.semantic_score < 1e-6);
        assert!(score.total_score < 1e-6);
        assert!(!score.flagged);
    }

    #[test]
    fn scoring_is_deterministic_for_fixed_state() {
        let mut scanner = scanner_with_baseline_x(ScoringConfig::default());
        scanner.record_accepted(&[0.6, 0.8]).unwrap();

        let a = scanner.scan("doc", &[0.0, 1.0]).unwrap();
        let b = scanner.scan("doc", &[0.0, 1.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn scan_does_not_mutate_cluster() {
        let scanner = scanner_with_baseline_x(ScoringConfig::default());
        scanner.scan("doc-1", &[0.0, 1.0]).unwrap();
        scanner.scan("doc-2", &[0.5, 0.5]).unwrap();
        assert_eq!(scanner.cluster_len(), 0);
    }

    #[test]
    fn cluster_is_bounded_oldest_evicted() {
        let mut scanner = SemanticScanner::new(
            vec![vec![1.0, 0.0]],
            2,
            ScoringConfig::default(),
        )
        .unwrap();

        scanner.record_accepted(&[1.0, 0.0]).unwrap();
        scanner.record_accepted(&[0.0, 1.0]).unwrap();
        scanner.record_accepted(&[0.6, 0.8]).unwrap();
        assert_eq!(scanner.cluster_len(), 2);

        // The first embedding ([1,0]) was evicted; the centroid of the two
        // survivors leans toward the y axis, so an x-axis document is far.
        let score = scanner.scan("doc", &[1.0, 0.0]).unwrap();
        assert!(score.cluster_distance > 0.2);
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let scanner = scanner_with_baseline_x(ScoringConfig::default());
        let result = scanner.scan("doc", &[1.0, 0.0, 0.0]);
        assert!(matches!(
            result,
            Err(SemanticError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        ));
    }

    #[test]
    fn degenerate_embedding_rejected() {
        let scanner = scanner_with_baseline_x(ScoringConfig::default());
        assert!(scanner.scan("doc", &[0.0, 0.0]).is_err());
        assert!(scanner.scan("doc", &[f32::NAN, 1.0]).is_err());
    }

    #[test]
    fn empty_baseline_rejected() {
        let result = SemanticScanner::new(Vec::new(), 16, ScoringConfig::default());
        assert!(matches!(result, Err(SemanticError::EmptyBaseline)));
    }

    #[test]
    fn mismatched_baseline_dimensions_rejected() {
        let result = SemanticScanner::new(
            vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
            16,
            ScoringConfig::default(),
        );
        assert!(matches!(
            result,
            Err(SemanticError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn from_texts_builds_scanner() {
        use crate::embedder::HashEmbedder;

        let embedder = HashEmbedder::new(32).unwrap();
        let texts = vec!["Default clean baseline policy text.".to_string()];
        let scanner =
            SemanticScanner::from_texts(&embedder, &texts, 16, ScoringConfig::default()).unwrap();
        assert_eq!(scanner.dim(), 32);

        // The baseline text itself scores ~0 against the baseline centroid.
        let embedding = embedder.embed(&texts[0]).unwrap();
        let score = scanner.scan("doc-baseline", &embedding).unwrap();
        assert!(score.semantic_score < 1e-6);
    }

    #[test]
    fn score_serde_roundtrip() {
        let score = SemanticScore {
            document_id: "doc-1".to_string(),
            semantic_score: 0.5,
            cluster_distance: 0.1,
            total_score: 0.34,
            threshold: 0.35,
            flagged: false,
        };
        let json = serde_json::to_string(&score).unwrap();
        let back: SemanticScore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, score);
    }
}
