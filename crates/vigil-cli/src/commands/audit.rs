//! `vigil audit` -- verify the hash-chained audit log.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::ExitCode;

#[derive(Args)]
pub struct AuditArgs {
    /// Path of the audit log to verify.
    #[arg(long, default_value = "data/audit/audit-log.jsonl")]
    pub log: PathBuf,

    /// Print every entry after verification.
    #[arg(long)]
    pub show_entries: bool,
}

pub fn execute(args: AuditArgs) -> anyhow::Result<ExitCode> {
    let status = vigil_audit::verify_chain(&args.log)
        .with_context(|| format!("verifying audit log '{}'", args.log.display()))?;

    if status.valid {
        println!(
            "audit chain OK: {} entries, tail {}",
            status.entries, status.tail_hash
        );
    } else {
        // Chain integrity violations are surfaced, never auto-repaired.
        println!(
            "audit chain BROKEN at seq {}: {} intact entries before the break",
            status.first_break.unwrap_or(0),
            status.entries
        );
    }

    if args.show_entries {
        for entry in vigil_audit::read_entries(&args.log)? {
            println!(
                "  [{}] {} {} -> {}",
                entry.seq, entry.timestamp, entry.document_id, entry.decision
            );
        }
    }

    if status.valid {
        Ok(ExitCode::Pass)
    } else {
        Ok(ExitCode::IntegrityViolation)
    }
}
