//! Evidence bundle construction and archive I/O.
//!
//! # Archive layout
//!
//! ```text
//! <bundle_id>.tar.gz
//! ├── document.bin           Raw document content as ingested
//! ├── lineage-record.json    Verification evidence from the lineage stage
//! ├── semantic-score.json    Scoring evidence (only when the stage ran)
//! ├── decision.json          Decision, reason, timestamps, bundle id
//! └── manifest.json          SHA-256 checksum per entry
//! ```
//!
//! The bundle id is content-addressed: SHA-256 over the document id, the
//! recomputed content hash, and the decision label. Re-quarantining the same
//! document for the same reason derives the same id, which the store turns
//! into a loud collision instead of a silent overwrite.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::QuarantineError;

/// Schema version stamped into every bundle.
pub const BUNDLE_SCHEMA_VERSION: &str = "1.0.0";

const DOCUMENT_ENTRY: &str = "document.bin";
const LINEAGE_ENTRY: &str = "lineage-record.json";
const SEMANTIC_ENTRY: &str = "semantic-score.json";
const DECISION_ENTRY: &str = "decision.json";
const MANIFEST_ENTRY: &str = "manifest.json";

// ---------------------------------------------------------------------------
// EvidenceBundle
// ---------------------------------------------------------------------------

/// Complete evidence bundle for one blocked document. Write-once.
#[derive(Debug, Clone)]
pub struct EvidenceBundle {
    /// Content-addressed bundle identifier (hex).
    pub bundle_id: String,

    /// ID of the blocked document.
    pub document_id: String,

    /// Decision label (`quarantined_lineage` or `quarantined_semantic`).
    pub decision: String,

    /// Human-readable reason for the block.
    pub reason: String,

    /// ISO-8601 creation timestamp.
    pub created_at: String,

    /// Raw document content as ingested.
    pub document_content: Vec<u8>,

    /// Lineage verification evidence.
    pub lineage_record: serde_json::Value,

    /// Semantic scoring evidence, when the semantic stage ran.
    pub semantic_score: Option<serde_json::Value>,

    /// Manifest of entry checksums.
    pub manifest: BundleManifest,
}

/// Manifest of archive entry checksums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Map of entry name -> SHA-256 hex digest.
    pub files: BTreeMap<String, String>,

    /// ISO-8601 timestamp of manifest creation.
    pub created_at: String,

    /// Schema version of the bundle layout.
    pub schema_version: String,
}

/// The `decision.json` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionEntry {
    bundle_id: String,
    document_id: String,
    decision: String,
    reason: String,
    created_at: String,
    schema_version: String,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an evidence bundle step by step.
pub struct EvidenceBundleBuilder {
    document_id: String,
    decision: String,
    reason: String,
    document_content: Option<Vec<u8>>,
    lineage_record: Option<serde_json::Value>,
    semantic_score: Option<serde_json::Value>,
}

impl EvidenceBundleBuilder {
    /// Creates a builder for the given document and decision label.
    pub fn new(document_id: impl Into<String>, decision: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            decision: decision.into(),
            reason: String::new(),
            document_content: None,
            lineage_record: None,
            semantic_score: None,
        }
    }

    /// Sets the human-readable block reason.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Sets the raw document content.
    pub fn document_content(mut self, content: Vec<u8>) -> Self {
        self.document_content = Some(content);
        self
    }

    /// Sets the lineage verification evidence.
    pub fn lineage_record(mut self, record: serde_json::Value) -> Self {
        self.lineage_record = Some(record);
        self
    }

    /// Sets the semantic scoring evidence.
    pub fn semantic_score(mut self, score: serde_json::Value) -> Self {
        self.semantic_score = Some(score);
        self
    }

    /// Builds the bundle, computing the bundle id and entry checksums.
    ///
    /// # Errors
    ///
    /// Returns [`QuarantineError::MissingField`] when the document content or
    /// the lineage record is missing -- a bundle without its evidence would
    /// defeat the point of quarantining.
    pub fn build(self) -> Result<EvidenceBundle, QuarantineError> {
        let document_content = self
            .document_content
            .ok_or_else(|| QuarantineError::MissingField("document_content".to_string()))?;
        let lineage_record = self
            .lineage_record
            .ok_or_else(|| QuarantineError::MissingField("lineage_record".to_string()))?;

        let created_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let bundle_id = compute_bundle_id(&self.document_id, &document_content, &self.decision);

        let lineage_json = to_pretty_bytes(&lineage_record)?;

        let mut files = BTreeMap::new();
        files.insert(DOCUMENT_ENTRY.to_string(), sha256_hex(&document_content));
        files.insert(LINEAGE_ENTRY.to_string(), sha256_hex(&lineage_json));

        if let Some(ref score) = self.semantic_score {
            files.insert(SEMANTIC_ENTRY.to_string(), sha256_hex(&to_pretty_bytes(score)?));
        }

        let decision_entry = DecisionEntry {
            bundle_id: bundle_id.clone(),
            document_id: self.document_id.clone(),
            decision: self.decision.clone(),
            reason: self.reason.clone(),
            created_at: created_at.clone(),
            schema_version: BUNDLE_SCHEMA_VERSION.to_string(),
        };
        files.insert(
            DECISION_ENTRY.to_string(),
            sha256_hex(&to_pretty_bytes(&decision_entry)?),
        );

        let manifest = BundleManifest {
            files,
            created_at: created_at.clone(),
            schema_version: BUNDLE_SCHEMA_VERSION.to_string(),
        };

        debug!(
            bundle_id = %bundle_id,
            document_id = %self.document_id,
            entries = manifest.files.len(),
            "evidence bundle built"
        );

        Ok(EvidenceBundle {
            bundle_id,
            document_id: self.document_id,
            decision: self.decision,
            reason: self.reason,
            created_at,
            document_content,
            lineage_record,
            semantic_score: self.semantic_score,
            manifest,
        })
    }
}

/// Content-addressed bundle id: SHA-256 over document id, content hash, and
/// decision label, separated so field boundaries cannot collide.
fn compute_bundle_id(document_id: &str, content: &[u8], decision: &str) -> String {
    let content_hash = sha256_hex(content);
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(content_hash.as_bytes());
    hasher.update([0x1f]);
    hasher.update(decision.as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Archive generation
// ---------------------------------------------------------------------------

/// Writes the bundle as a gzip-compressed tar archive at `output`.
pub fn write_bundle_archive(bundle: &EvidenceBundle, output: &Path) -> Result<(), QuarantineError> {
    let file = std::fs::File::create(output)
        .map_err(|e| QuarantineError::Io(format!("creating bundle file: {e}")))?;

    let enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut archive = tar::Builder::new(enc);

    let mut add_entry = |name: &str, content: &[u8]| -> Result<(), QuarantineError> {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o444); // bundles are read-only evidence
        header.set_cksum();

        archive
            .append_data(&mut header, name, content)
            .map_err(|e| QuarantineError::Io(format!("appending {name}: {e}")))
    };

    add_entry(DOCUMENT_ENTRY, &bundle.document_content)?;
    add_entry(LINEAGE_ENTRY, &to_pretty_bytes(&bundle.lineage_record)?)?;

    if let Some(ref score) = bundle.semantic_score {
        add_entry(SEMANTIC_ENTRY, &to_pretty_bytes(score)?)?;
    }

    let decision_entry = DecisionEntry {
        bundle_id: bundle.bundle_id.clone(),
        document_id: bundle.document_id.clone(),
        decision: bundle.decision.clone(),
        reason: bundle.reason.clone(),
        created_at: bundle.created_at.clone(),
        schema_version: BUNDLE_SCHEMA_VERSION.to_string(),
    };
    add_entry(DECISION_ENTRY, &to_pretty_bytes(&decision_entry)?)?;
    add_entry(MANIFEST_ENTRY, &to_pretty_bytes(&bundle.manifest)?)?;

    let gz = archive
        .into_inner()
        .map_err(|e| QuarantineError::Io(format!("finalizing archive: {e}")))?;
    gz.finish()
        .map_err(|e| QuarantineError::Io(format!("finishing gzip: {e}")))?;

    info!(path = %output.display(), "evidence bundle written");
    Ok(())
}

/// Reads a bundle archive and verifies manifest checksums.
///
/// 同時檢查 archive 是否包含 manifest 未列出的額外檔案。
pub fn verify_bundle_archive(path: &Path) -> Result<EvidenceBundle, QuarantineError> {
    let file = std::fs::File::open(path)
        .map_err(|e| QuarantineError::Io(format!("opening bundle: {e}")))?;
    let dec = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(dec);

    let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();

    for entry in archive
        .entries()
        .map_err(|e| QuarantineError::Io(format!("reading entries: {e}")))?
    {
        let mut entry = entry.map_err(|e| QuarantineError::Io(format!("reading entry: {e}")))?;
        let name = entry
            .path()
            .map_err(|e| QuarantineError::Io(format!("entry path: {e}")))?
            .to_string_lossy()
            .to_string();
        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut data)
            .map_err(|e| QuarantineError::Io(format!("reading {name}: {e}")))?;
        files.insert(name, data);
    }

    let manifest_data = files.get(MANIFEST_ENTRY).ok_or_else(|| {
        QuarantineError::MissingField(format!("{MANIFEST_ENTRY} not found in archive"))
    })?;
    let manifest: BundleManifest = serde_json::from_slice(manifest_data)
        .map_err(|e| QuarantineError::Serialization(format!("parsing manifest: {e}")))?;

    // Reject entries the manifest does not know about.
    let known: std::collections::BTreeSet<&str> = manifest
        .files
        .keys()
        .map(String::as_str)
        .chain(std::iter::once(MANIFEST_ENTRY))
        .collect();
    for name in files.keys() {
        if !known.contains(name.as_str()) {
            return Err(QuarantineError::IntegrityViolation(format!(
                "unexpected file in archive not listed in manifest: '{name}'"
            )));
        }
    }

    for (name, expected) in &manifest.files {
        let data = files.get(name.as_str()).ok_or_else(|| {
            QuarantineError::IntegrityViolation(format!(
                "{name} listed in manifest but not in archive"
            ))
        })?;
        let actual = sha256_hex(data);
        if actual != *expected {
            return Err(QuarantineError::IntegrityViolation(format!(
                "{name}: expected {expected}, got {actual}"
            )));
        }
    }

    let decision_data = files.get(DECISION_ENTRY).ok_or_else(|| {
        QuarantineError::MissingField(format!("{DECISION_ENTRY} not in archive"))
    })?;
    let decision: DecisionEntry = serde_json::from_slice(decision_data)
        .map_err(|e| QuarantineError::Serialization(format!("parsing decision: {e}")))?;

    let lineage_data = files.get(LINEAGE_ENTRY).ok_or_else(|| {
        QuarantineError::MissingField(format!("{LINEAGE_ENTRY} not in archive"))
    })?;
    let lineage_record: serde_json::Value = serde_json::from_slice(lineage_data)
        .map_err(|e| QuarantineError::Serialization(format!("parsing lineage record: {e}")))?;

    let semantic_score = files
        .get(SEMANTIC_ENTRY)
        .and_then(|data| serde_json::from_slice(data).ok());

    let document_content = files
        .get(DOCUMENT_ENTRY)
        .cloned()
        .ok_or_else(|| QuarantineError::MissingField(format!("{DOCUMENT_ENTRY} not in archive")))?;

    info!(path = %path.display(), "evidence bundle verified");

    Ok(EvidenceBundle {
        bundle_id: decision.bundle_id,
        document_id: decision.document_id,
        decision: decision.decision,
        reason: decision.reason,
        created_at: decision.created_at,
        document_content,
        lineage_record,
        semantic_score,
        manifest,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn to_pretty_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, QuarantineError> {
    serde_json::to_vec_pretty(value).map_err(|e| QuarantineError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
