//! Hash-chained audit log for the Vigil admission pipeline.
//!
//! Every processed document produces exactly one [`AuditEntry`], appended to
//! a newline-delimited JSON file that is never rewritten in place. Each
//! entry's `entry_hash` is a SHA-256 over the entry's own fields *and* the
//! previous entry's `entry_hash`, so any retroactive edit, deletion, or
//! reordering breaks the chain at or after the tampered entry.
//!
//! # File format
//!
//! One compact JSON object per line:
//!
//! ```text
//! {"decision":"accepted","document_id":"doc-1","entry_hash":"sha256:...","prev_hash":"sha256:000...0","seq":0,"timestamp":"2026-01-05T09:00:00Z"}
//! ```
//!
//! The first entry's `prev_hash` is the fixed genesis constant
//! [`GENESIS_HASH`]. Sequence numbers are assigned by the log itself,
//! starting at 0 with no gaps.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Top-level error type for the vigil-audit crate.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// An I/O error occurred while reading or writing the log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log line could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The existing log is broken; appending to it would hide the damage.
    #[error("audit chain broken at seq {seq}: expected {expected}, got {got}")]
    ChainBroken {
        seq: u64,
        expected: String,
        got: String,
    },
}

// ---------------------------------------------------------------------------
// Genesis
// ---------------------------------------------------------------------------

/// `prev_hash` of the very first entry in an empty log.
pub const GENESIS_HASH: &str =
    "sha256:0000000000000000000000000000000000000000000000000000000000000000";

// ---------------------------------------------------------------------------
// AuditEntry
// ---------------------------------------------------------------------------

/// A single line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, starting at 0, strictly increasing, no gaps.
    pub seq: u64,

    /// RFC 3339 timestamp of the decision.
    pub timestamp: String,

    /// Identifier of the processed document.
    pub document_id: String,

    /// Serialized decision label (`accepted`, `quarantined_lineage`,
    /// `quarantined_semantic`).
    pub decision: String,

    /// `entry_hash` of the previous entry, or [`GENESIS_HASH`] for seq 0.
    pub prev_hash: String,

    /// SHA-256 over this entry's fields and `prev_hash`.
    pub entry_hash: String,
}

/// Computes the `entry_hash` for the given entry fields.
///
/// The digest covers `prev_hash || seq || document_id || decision ||
/// timestamp`, encoded as compact JSON. `serde_json` maps are key-sorted, so
/// the payload encoding is canonical without an explicit sort pass.
fn compute_entry_hash(
    prev_hash: &str,
    seq: u64,
    document_id: &str,
    decision: &str,
    timestamp: &str,
) -> Result<String, AuditError> {
    let payload = serde_json::json!({
        "prev_hash": prev_hash,
        "seq": seq,
        "document_id": document_id,
        "decision": decision,
        "timestamp": timestamp,
    });
    let bytes = serde_json::to_vec(&payload)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

// ---------------------------------------------------------------------------
// AuditLog (single writer)
// ---------------------------------------------------------------------------

/// Append-only writer over the audit log file.
///
/// Opening the log verifies the whole existing chain and recovers the tail
/// hash and next sequence number; an empty or missing file seeds the genesis
/// constant. The caller is responsible for single-writer discipline (the
/// pipeline engine wraps the log in a mutex): the append region must cover
/// read-tail → compute → persist → advance, because no two entries may be
/// derived from the same `prev_hash`.
pub struct AuditLog {
    path: PathBuf,
    file: File,
    tail_hash: String,
    next_seq: u64,
}

impl AuditLog {
    /// Opens (creating if necessary) the audit log at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ChainBroken`] if the existing file fails chain
    /// verification -- appending to a tampered log would mask the damage.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let status = verify_chain(&path)?;
        if let Some(seq) = status.first_break {
            return Err(AuditError::ChainBroken {
                seq,
                expected: "intact chain".to_string(),
                got: "tampered entry".to_string(),
            });
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(
            path = %path.display(),
            entries = status.entries,
            "audit log opened"
        );

        Ok(Self {
            path,
            file,
            tail_hash: status.tail_hash,
            next_seq: status.entries,
        })
    }

    /// The `entry_hash` of the most recent entry ([`GENESIS_HASH`] when empty).
    pub fn tail_hash(&self) -> &str {
        &self.tail_hash
    }

    /// The sequence number the next append will receive.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry, durably persisting it before returning.
    ///
    /// The entry is flushed to the file before the in-memory tail advances,
    /// so a failed write leaves the log and the cursor consistent.
    pub fn append(
        &mut self,
        document_id: &str,
        decision: &str,
        timestamp: &str,
    ) -> Result<AuditEntry, AuditError> {
        let seq = self.next_seq;
        let entry_hash =
            compute_entry_hash(&self.tail_hash, seq, document_id, decision, timestamp)?;

        let entry = AuditEntry {
            seq,
            timestamp: timestamp.to_string(),
            document_id: document_id.to_string(),
            decision: decision.to_string(),
            prev_hash: self.tail_hash.clone(),
            entry_hash: entry_hash.clone(),
        };

        let line = serde_json::to_vec(&entry)?;
        self.file.write_all(&line)?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;

        self.tail_hash = entry_hash;
        self.next_seq += 1;

        debug!(seq, document_id, decision, "audit entry appended");
        Ok(entry)
    }
}

// ---------------------------------------------------------------------------
// Chain verification
// ---------------------------------------------------------------------------

/// Result of a full chain verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStatus {
    /// `true` when every stored hash recomputes exactly.
    pub valid: bool,
    /// Sequence number of the first tampered entry, when invalid.
    pub first_break: Option<u64>,
    /// Number of entries walked before the first break (or total when valid).
    pub entries: u64,
    /// `entry_hash` of the last intact entry ([`GENESIS_HASH`] when empty).
    pub tail_hash: String,
}

/// Recomputes every `entry_hash` in sequence order and compares against the
/// stored chain.
///
/// A missing file is an empty, valid chain (the reset operation clears the
/// store; the log reseeds from genesis). Any divergence -- an unparseable
/// line, a sequence gap, a `prev_hash` that does not match the running tail,
/// or an `entry_hash` that does not recompute -- is reported as the first
/// break at that position rather than an error, so tampering is localized
/// instead of aborting the scan. Re-running on an unmodified log always
/// returns the same result.
///
/// # Errors
///
/// Only genuine I/O failures (the file exists but cannot be read) surface as
/// errors.
pub fn verify_chain(path: impl AsRef<Path>) -> Result<ChainStatus, AuditError> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(ChainStatus {
            valid: true,
            first_break: None,
            entries: 0,
            tail_hash: GENESIS_HASH.to_string(),
        });
    }

    let reader = BufReader::new(File::open(path)?);

    let mut expected_prev = GENESIS_HASH.to_string();
    let mut expected_seq: u64 = 0;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let entry: AuditEntry = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(seq = expected_seq, error = %err, "unparseable audit entry");
                return Ok(broken_at(expected_seq, expected_prev));
            }
        };

        let recomputed = compute_entry_hash(
            &entry.prev_hash,
            entry.seq,
            &entry.document_id,
            &entry.decision,
            &entry.timestamp,
        )?;

        if entry.seq != expected_seq
            || entry.prev_hash != expected_prev
            || entry.entry_hash != recomputed
        {
            warn!(seq = expected_seq, "audit chain break detected");
            return Ok(broken_at(expected_seq, expected_prev));
        }

        expected_prev = entry.entry_hash;
        expected_seq += 1;
    }

    Ok(ChainStatus {
        valid: true,
        first_break: None,
        entries: expected_seq,
        tail_hash: expected_prev,
    })
}

fn broken_at(seq: u64, tail_hash: String) -> ChainStatus {
    ChainStatus {
        valid: false,
        first_break: Some(seq),
        entries: seq,
        tail_hash,
    }
}

/// Reads all entries of a log without verifying the chain.
///
/// Forensic helper for the CLI; unparseable lines are skipped with a warning.
pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, AuditError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!(error = %err, "skipping unparseable audit entry"),
        }
    }
    info!(path = %path.display(), entries = entries.len(), "audit log read");
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit-log.jsonl");
        (dir, path)
    }

    #[test]
    fn empty_log_seeds_genesis() {
        let (_dir, path) = temp_log();
        let log = AuditLog::open(&path).unwrap();
        assert_eq!(log.tail_hash(), GENESIS_HASH);
        assert_eq!(log.next_seq(), 0);
    }

    #[test]
    fn append_advances_seq_and_tail() {
        let (_dir, path) = temp_log();
        let mut log = AuditLog::open(&path).unwrap();

        let e0 = log
            .append("doc-1", "accepted", "2026-01-05T09:00:00Z")
            .unwrap();
        assert_eq!(e0.seq, 0);
        assert_eq!(e0.prev_hash, GENESIS_HASH);
        assert!(e0.entry_hash.starts_with("sha256:"));

        let e1 = log
            .append("doc-2", "quarantined_lineage", "2026-01-05T09:00:01Z")
            .unwrap();
        assert_eq!(e1.seq, 1);
        assert_eq!(e1.prev_hash, e0.entry_hash);
        assert_eq!(log.next_seq(), 2);
        assert_eq!(log.tail_hash(), e1.entry_hash);
    }

    #[test]
    fn chain_round_trip_verifies() {
        let (_dir, path) = temp_log();
        let mut log = AuditLog::open(&path).unwrap();
        for i in 0..5 {
            log.append(
                &format!("doc-{i}"),
                "accepted",
                &format!("2026-01-05T09:00:0{i}Z"),
            )
            .unwrap();
        }

        let status = verify_chain(&path).unwrap();
        assert!(status.valid);
        assert_eq!(status.first_break, None);
        assert_eq!(status.entries, 5);
        assert_eq!(status.tail_hash, log.tail_hash());
    }

    #[test]
    fn verify_is_idempotent() {
        let (_dir, path) = temp_log();
        let mut log = AuditLog::open(&path).unwrap();
        log.append("doc-1", "accepted", "2026-01-05T09:00:00Z")
            .unwrap();

        let first = verify_chain(&path).unwrap();
        let second = verify_chain(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn tampered_field_localizes_break() {
        let (_dir, path) = temp_log();
        let mut log = AuditLog::open(&path).unwrap();
        for i in 0..4 {
            log.append(
                &format!("doc-{i}"),
                "accepted",
                &format!("2026-01-05T09:00:0{i}Z"),
            )
            .unwrap();
        }
        drop(log);

        // Flip the decision of entry 2 without recomputing its hash.
        let content = std::fs::read_to_string(&path).unwrap();
        let tampered: Vec<String> = content
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i == 2 {
                    line.replace("accepted", "quarantined_semantic")
                } else {
                    line.to_string()
                }
            })
            .collect();
        std::fs::write(&path, tampered.join("\n") + "\n").unwrap();

        let status = verify_chain(&path).unwrap();
        assert!(!status.valid);
        assert_eq!(status.first_break, Some(2));
        assert_eq!(status.entries, 2);
    }

    #[test]
    fn deleted_entry_breaks_chain() {
        let (_dir, path) = temp_log();
        let mut log = AuditLog::open(&path).unwrap();
        for i in 0..3 {
            log.append(&format!("doc-{i}"), "accepted", "2026-01-05T09:00:00Z")
                .unwrap();
        }
        drop(log);

        // Drop the middle line entirely.
        let content = std::fs::read_to_string(&path).unwrap();
        let kept: Vec<&str> = content
            .lines()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, line)| line)
            .collect();
        std::fs::write(&path, kept.join("\n") + "\n").unwrap();

        let status = verify_chain(&path).unwrap();
        assert!(!status.valid);
        assert_eq!(status.first_break, Some(1));
    }

    #[test]
    fn reordered_entries_break_chain() {
        let (_dir, path) = temp_log();
        let mut log = AuditLog::open(&path).unwrap();
        for i in 0..3 {
            log.append(&format!("doc-{i}"), "accepted", "2026-01-05T09:00:00Z")
                .unwrap();
        }
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<&str> = content.lines().collect();
        lines.swap(1, 2);
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();

        let status = verify_chain(&path).unwrap();
        assert!(!status.valid);
        assert_eq!(status.first_break, Some(1));
    }

    #[test]
    fn unparseable_line_counts_as_break() {
        let (_dir, path) = temp_log();
        let mut log = AuditLog::open(&path).unwrap();
        log.append("doc-0", "accepted", "2026-01-05T09:00:00Z")
            .unwrap();
        drop(log);

        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{not json\n");
        std::fs::write(&path, content).unwrap();

        let status = verify_chain(&path).unwrap();
        assert!(!status.valid);
        assert_eq!(status.first_break, Some(1));
    }

    #[test]
    fn reopen_recovers_tail() {
        let (_dir, path) = temp_log();
        let tail = {
            let mut log = AuditLog::open(&path).unwrap();
            log.append("doc-0", "accepted", "2026-01-05T09:00:00Z")
                .unwrap();
            log.append("doc-1", "quarantined_semantic", "2026-01-05T09:00:01Z")
                .unwrap();
            log.tail_hash().to_string()
        };

        let log = AuditLog::open(&path).unwrap();
        assert_eq!(log.tail_hash(), tail);
        assert_eq!(log.next_seq(), 2);
    }

    #[test]
    fn open_refuses_tampered_log() {
        let (_dir, path) = temp_log();
        let mut log = AuditLog::open(&path).unwrap();
        log.append("doc-0", "accepted", "2026-01-05T09:00:00Z")
            .unwrap();
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replace("accepted", "rejected")).unwrap();

        let result = AuditLog::open(&path);
        assert!(matches!(result, Err(AuditError::ChainBroken { seq: 0, .. })));
    }

    #[test]
    fn entry_hash_covers_every_field() {
        let base =
            compute_entry_hash(GENESIS_HASH, 0, "doc-1", "accepted", "2026-01-05T09:00:00Z")
                .unwrap();

        let variants = [
            compute_entry_hash(GENESIS_HASH, 1, "doc-1", "accepted", "2026-01-05T09:00:00Z"),
            compute_entry_hash(GENESIS_HASH, 0, "doc-2", "accepted", "2026-01-05T09:00:00Z"),
            compute_entry_hash(
                GENESIS_HASH,
                0,
                "doc-1",
                "quarantined_lineage",
                "2026-01-05T09:00:00Z",
            ),
            compute_entry_hash(GENESIS_HASH, 0, "doc-1", "accepted", "2026-01-05T09:00:01Z"),
        ];
        for variant in variants {
            assert_ne!(base, variant.unwrap());
        }
    }

    #[test]
    fn read_entries_returns_all() {
        let (_dir, path) = temp_log();
        let mut log = AuditLog::open(&path).unwrap();
        log.append("doc-0", "accepted", "2026-01-05T09:00:00Z")
            .unwrap();
        log.append("doc-1", "accepted", "2026-01-05T09:00:01Z")
            .unwrap();

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].document_id, "doc-0");
        assert_eq!(entries[1].document_id, "doc-1");
    }
}
