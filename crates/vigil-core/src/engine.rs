//! Admission pipeline orchestrator.
//!
//! The [`AdmissionPipeline`] sequences the full admission decision for one
//! document:
//!
//! 1. **Lineage** -- recompute the content hash and validate the signature
//!    policy. A failure short-circuits straight to quarantine; semantic
//!    scanning is never invoked for it.
//! 2. **Semantic** -- embed the content (timeout-bounded) and score it
//!    against the baseline centroid and the accepted cluster.
//! 3. **Quarantine** -- on any block, persist an immutable evidence bundle
//!    before anything else happens.
//! 4. **Audit** -- append exactly one hash-chained entry per document. The
//!    document is only done once the append succeeds.
//!
//! # Concurrency
//!
//! Lineage verification and semantic scoring are pure per call; documents
//! may be processed from multiple threads. The two pieces of shared mutable
//! state -- the audit log tail and the accepted-document cluster -- are each
//! behind a mutex. For accepted documents the cluster lock is held across
//! the audit append so cluster state and log order cannot diverge.
//!
//! # Failure atomicity
//!
//! An embedding failure aborts the run before any decision is made: no
//! bundle, no audit entry, document held for retry. A quarantine or audit
//! write failure surfaces as [`VigilError::Persistence`] and the document
//! never reaches done; the cluster is only updated after a successful
//! append, so a failed run leaves no partial state behind.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use vigil_audit::AuditLog;
use vigil_lineage::verify::failure_kind;
use vigil_lineage::{Document, LineageRecord, LineageVerifier, StaticKeyStore};
use vigil_quarantine::{EvidenceBundleBuilder, QuarantineStore};
use vigil_semantic::{embed_with_timeout, SemanticError, SemanticScanner, SemanticScore, TextEmbedder};

use crate::config::VigilConfig;
use crate::{BlockReason, Decision, VigilError};

// ---------------------------------------------------------------------------
// ProcessOutcome
// ---------------------------------------------------------------------------

/// The result of processing one document through the full pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    /// Identifier of the processed document.
    pub document_id: String,
    /// Final admission decision.
    pub decision: Decision,
    /// Lineage verification evidence.
    pub lineage_record: LineageRecord,
    /// Semantic scoring evidence; `None` when lineage short-circuited.
    pub semantic_score: Option<SemanticScore>,
    /// Evidence bundle id; `None` for accepted documents.
    pub bundle_id: Option<String>,
    /// Sequence number of the audit entry recording this decision.
    pub audit_seq: u64,
}

impl ProcessOutcome {
    /// Human-readable reason string for display.
    #[must_use]
    pub fn reason(&self) -> String {
        match self.decision {
            Decision::Accepted => "document clean".to_string(),
            Decision::Quarantined(reason) => reason.describe(),
        }
    }
}

// ---------------------------------------------------------------------------
// AdmissionPipeline
// ---------------------------------------------------------------------------

/// The document-admission pipeline orchestrator.
pub struct AdmissionPipeline {
    verifier: LineageVerifier,
    embedder: Arc<dyn TextEmbedder>,
    scanner: Mutex<SemanticScanner>,
    quarantine: QuarantineStore,
    audit: Mutex<AuditLog>,
    embed_timeout: Duration,
}

impl AdmissionPipeline {
    /// Wires a pipeline from configuration and an embedding provider.
    ///
    /// Baseline reference texts are embedded up front; the quarantine
    /// directory and audit log are opened (and verified) before the first
    /// document is accepted.
    ///
    /// # Errors
    ///
    /// Fails on invalid trusted keys, a degenerate baseline, or stores that
    /// cannot be opened (including an audit log that fails chain
    /// verification).
    pub fn new(config: &VigilConfig, embedder: Arc<dyn TextEmbedder>) -> Result<Self, VigilError> {
        let keys = StaticKeyStore::from_base64(&config.trust.trusted_keys)?;
        let verifier = LineageVerifier::new(Box::new(keys));

        let scanner = SemanticScanner::from_texts(
            embedder.as_ref(),
            &config.scoring.baseline_texts,
            config.pipeline.cluster_capacity,
            config.scoring.scoring_config(),
        )?;

        let quarantine = QuarantineStore::open(&config.storage.quarantine_dir)
            .map_err(|e| VigilError::Persistence(e.to_string()))?;
        let audit = AuditLog::open(&config.storage.audit_log_path)
            .map_err(|e| VigilError::Persistence(e.to_string()))?;

        info!(
            audit_log = %config.storage.audit_log_path.display(),
            quarantine_dir = %config.storage.quarantine_dir.display(),
            "admission pipeline ready"
        );

        Ok(Self {
            verifier,
            embedder,
            scanner: Mutex::new(scanner),
            quarantine,
            audit: Mutex::new(audit),
            embed_timeout: Duration::from_millis(config.pipeline.embed_timeout_ms),
        })
    }

    /// Processes one document to a terminal decision.
    ///
    /// Every return of `Ok` means exactly one audit entry was appended and,
    /// for blocked documents, exactly one evidence bundle was persisted.
    pub fn process(&self, document: &Document) -> Result<ProcessOutcome, VigilError> {
        info!(document_id = %document.id, "document received");

        // Stage 1: lineage verification.
        let record = self.verifier.verify(document);
        if let Some(kind) = failure_kind(document, &record) {
            // Fail fast on provenance; semantic scanning is skipped entirely.
            let decision = Decision::Quarantined(BlockReason::Lineage(kind));
            return self.block(document, decision, &record, None);
        }
        debug!(document_id = %document.id, "lineage passed");

        // Stage 2: semantic scoring (timeout-bounded embedding).
        let text = String::from_utf8_lossy(&document.content);
        let embedding = embed_with_timeout(&self.embedder, &text, self.embed_timeout)
            .map_err(map_embedding_error)?;

        let score = self.lock_scanner()?.scan(&document.id, &embedding)?;
        if score.flagged {
            let decision = Decision::Quarantined(BlockReason::Semantic);
            return self.block(document, decision, &record, Some(&score));
        }

        // Accept: append the audit entry, then grow the cluster under the
        // same lock so log order and cluster state stay consistent.
        let mut scanner = self.lock_scanner()?;
        let entry = self.append_audit(&document.id, Decision::Accepted)?;
        scanner.record_accepted(&embedding)?;
        drop(scanner);

        info!(document_id = %document.id, seq = entry.seq, "document accepted");
        Ok(ProcessOutcome {
            document_id: document.id.clone(),
            decision: Decision::Accepted,
            lineage_record: record,
            semantic_score: Some(score),
            bundle_id: None,
            audit_seq: entry.seq,
        })
    }

    /// Routes a blocked document through quarantine, then the audit log.
    fn block(
        &self,
        document: &Document,
        decision: Decision,
        record: &LineageRecord,
        score: Option<&SemanticScore>,
    ) -> Result<ProcessOutcome, VigilError> {
        let reason = match decision {
            Decision::Quarantined(block_reason) => block_reason.describe(),
            Decision::Accepted => {
                return Err(VigilError::Internal(
                    "block() invoked with an accept decision".to_string(),
                ))
            }
        };
        warn!(document_id = %document.id, decision = %decision, %reason, "document blocked");

        let mut builder = EvidenceBundleBuilder::new(&document.id, decision.label())
            .reason(&reason)
            .document_content(document.content.clone())
            .lineage_record(serde_json::to_value(record)?);
        if let Some(score) = score {
            builder = builder.semantic_score(serde_json::to_value(score)?);
        }
        let bundle = builder
            .build()
            .map_err(|e| VigilError::Persistence(e.to_string()))?;

        // Evidence is persisted before the decision is logged; a document is
        // never dropped without its bundle.
        self.quarantine
            .persist(&bundle, false)
            .map_err(|e| VigilError::Persistence(e.to_string()))?;

        let entry = self.append_audit(&document.id, decision)?;

        Ok(ProcessOutcome {
            document_id: document.id.clone(),
            decision,
            lineage_record: record.clone(),
            semantic_score: score.cloned(),
            bundle_id: Some(bundle.bundle_id),
            audit_seq: entry.seq,
        })
    }

    /// Appends the single audit entry for a terminal decision.
    fn append_audit(
        &self,
        document_id: &str,
        decision: Decision,
    ) -> Result<vigil_audit::AuditEntry, VigilError> {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let mut audit = self
            .audit
            .lock()
            .map_err(|_| VigilError::Internal("audit log lock poisoned".to_string()))?;
        audit
            .append(document_id, decision.label(), &timestamp)
            .map_err(|e| VigilError::Persistence(e.to_string()))
    }

    fn lock_scanner(&self) -> Result<MutexGuard<'_, SemanticScanner>, VigilError> {
        self.scanner
            .lock()
            .map_err(|_| VigilError::Internal("semantic cluster lock poisoned".to_string()))
    }

    /// Number of accepted embeddings currently in the cluster.
    pub fn cluster_len(&self) -> Result<usize, VigilError> {
        Ok(self.lock_scanner()?.cluster_len())
    }
}

/// Maps embedding-provider faults onto the pipeline's retryable error kind;
/// genuine scoring errors pass through.
fn map_embedding_error(err: SemanticError) -> VigilError {
    match err {
        SemanticError::EmbeddingFailed(_) | SemanticError::EmbeddingTimeout { .. } => {
            VigilError::EmbeddingUnavailable(err.to_string())
        }
        other => VigilError::Semantic(other),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
