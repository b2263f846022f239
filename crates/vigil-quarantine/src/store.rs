//! Durable quarantine store.
//!
//! One `<bundle_id>.tar.gz` per evidence bundle, written before the
//! quarantine call returns and never mutated afterwards. Collisions on the
//! content-addressed bundle id fail loudly by default; overwriting recorded
//! evidence requires an explicit `force`.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::bundle::{write_bundle_archive, EvidenceBundle};
use crate::QuarantineError;

/// Filesystem-backed store of evidence bundles.
#[derive(Debug, Clone)]
pub struct QuarantineStore {
    dir: PathBuf,
}

impl QuarantineStore {
    /// Opens (creating if necessary) the quarantine directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, QuarantineError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| QuarantineError::Io(format!("creating quarantine dir: {e}")))?;
        Ok(Self { dir })
    }

    /// Directory this store writes into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an evidence bundle is (or would be) stored at.
    #[must_use]
    pub fn bundle_path(&self, bundle_id: &str) -> PathBuf {
        self.dir.join(format!("{bundle_id}.tar.gz"))
    }

    /// Whether a bundle with this id has already been persisted.
    #[must_use]
    pub fn contains(&self, bundle_id: &str) -> bool {
        self.bundle_path(bundle_id).is_file()
    }

    /// Persists an evidence bundle, returning its archive path.
    ///
    /// # Errors
    ///
    /// Returns [`QuarantineError::BundleExists`] when a bundle with the same
    /// id is already stored and `force` is `false`. With `force` the existing
    /// archive is replaced (and the replacement is logged).
    pub fn persist(
        &self,
        bundle: &EvidenceBundle,
        force: bool,
    ) -> Result<PathBuf, QuarantineError> {
        let path = self.bundle_path(&bundle.bundle_id);

        if path.exists() {
            if !force {
                return Err(QuarantineError::BundleExists {
                    bundle_id: bundle.bundle_id.clone(),
                });
            }
            warn!(
                bundle_id = %bundle.bundle_id,
                path = %path.display(),
                "forcibly overwriting existing evidence bundle"
            );
        }

        write_bundle_archive(bundle, &path)?;
        info!(
            bundle_id = %bundle.bundle_id,
            document_id = %bundle.document_id,
            decision = %bundle.decision,
            "document quarantined"
        );
        Ok(path)
    }

    /// Lists the ids of all persisted bundles, sorted.
    pub fn bundle_ids(&self) -> Result<Vec<String>, QuarantineError> {
        let mut ids = Vec::new();
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| QuarantineError::Io(format!("reading quarantine dir: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| QuarantineError::Io(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(id) = name.strip_suffix(".tar.gz") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
