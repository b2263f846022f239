//! Configuration loading and merging for Vigil.
//!
//! Vigil resolves configuration from multiple sources with project > home >
//! defaults precedence. Configuration is loaded from `.vigil.yaml` files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vigil_semantic::ScoringConfig;

use crate::VigilError;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Top-level Vigil configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    /// Semantic scoring settings.
    pub scoring: ScoringSection,
    /// Pipeline execution settings.
    pub pipeline: PipelineSection,
    /// Durable storage locations.
    pub storage: StorageSection,
    /// Trusted provenance keys.
    pub trust: TrustSection,
}

// ---------------------------------------------------------------------------
// ScoringSection
// ---------------------------------------------------------------------------

/// Semantic scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    /// Weight of the baseline distance vs the cluster distance.
    pub alpha: f64,
    /// Total-score threshold at or above which a document is flagged.
    pub semantic_threshold: f64,
    /// Baseline reference texts anchoring drift detection.
    pub baseline_texts: Vec<String>,
    /// Embedding dimension expected from the provider.
    pub embedding_dim: usize,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            semantic_threshold: 0.35,
            baseline_texts: vec!["Default clean baseline policy text.".to_string()],
            embedding_dim: 64,
        }
    }
}

impl ScoringSection {
    /// The scoring weights handed to the semantic scanner at construction.
    #[must_use]
    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            alpha: self.alpha,
            semantic_threshold: self.semantic_threshold,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineSection
// ---------------------------------------------------------------------------

/// Pipeline execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Upper bound on one embedding-provider call, in milliseconds.
    pub embed_timeout_ms: u64,
    /// Maximum number of accepted embeddings retained in the cluster.
    pub cluster_capacity: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            embed_timeout_ms: 5_000,
            cluster_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Durable storage locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Path of the hash-chained audit log.
    pub audit_log_path: PathBuf,
    /// Directory holding evidence bundle archives.
    pub quarantine_dir: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            audit_log_path: PathBuf::from("data/audit/audit-log.jsonl"),
            quarantine_dir: PathBuf::from("data/quarantine"),
        }
    }
}

// ---------------------------------------------------------------------------
// TrustSection
// ---------------------------------------------------------------------------

/// Trusted provenance keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustSection {
    /// Map of source identity -> base64 ed25519 public key.
    pub trusted_keys: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load and merge configuration from multiple sources.
///
/// Resolution order (highest priority first):
/// 1. `.vigil.yaml` in the project directory
/// 2. `.vigil.yaml` in the user home directory
/// 3. Built-in defaults
///
/// # Errors
///
/// Returns [`VigilError::Config`] if a config file exists but is malformed.
pub fn load_config(project_dir: Option<&Path>) -> Result<VigilConfig, VigilError> {
    let mut config = VigilConfig::default();

    if let Some(home) = home_dir() {
        let home_config = home.join(".vigil.yaml");
        if home_config.is_file() {
            debug!(path = %home_config.display(), "loading home config");
            let layer = load_config_file(&home_config)?;
            config = merge_config(config, layer);
        }
    }

    if let Some(dir) = project_dir {
        let project_config = dir.join(".vigil.yaml");
        if project_config.is_file() {
            debug!(path = %project_config.display(), "loading project config");
            let layer = load_config_file(&project_config)?;
            config = merge_config(config, layer);
        }
    }

    info!("configuration loaded");
    Ok(config)
}

/// Load a single config file and deserialize it.
fn load_config_file(path: &Path) -> Result<VigilConfig, VigilError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        VigilError::Config(format!(
            "failed to read config file '{}': {e}",
            path.display()
        ))
    })?;

    serde_yml::from_str(&content).map_err(|e| {
        VigilError::Config(format!(
            "failed to parse config file '{}': {e}",
            path.display()
        ))
    })
}

/// Merge `overlay` on top of `base`. Non-default values in `overlay` win.
fn merge_config(base: VigilConfig, overlay: VigilConfig) -> VigilConfig {
    VigilConfig {
        scoring: merge_scoring(base.scoring, overlay.scoring),
        pipeline: overlay.pipeline,
        storage: overlay.storage,
        trust: merge_trust(base.trust, overlay.trust),
    }
}

fn merge_scoring(base: ScoringSection, overlay: ScoringSection) -> ScoringSection {
    ScoringSection {
        alpha: overlay.alpha,
        semantic_threshold: overlay.semantic_threshold,
        baseline_texts: if overlay.baseline_texts == ScoringSection::default().baseline_texts {
            base.baseline_texts
        } else {
            overlay.baseline_texts
        },
        embedding_dim: overlay.embedding_dim,
    }
}

fn merge_trust(base: TrustSection, overlay: TrustSection) -> TrustSection {
    // Union keys from both levels; overlay wins per identity.
    let mut merged = base.trusted_keys;
    for (identity, key) in overlay.trusted_keys {
        merged.insert(identity, key);
    }
    TrustSection {
        trusted_keys: merged,
    }
}

/// Get the user home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
