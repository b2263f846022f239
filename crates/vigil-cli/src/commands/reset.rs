//! `vigil reset` -- clear the audit log and quarantine store.
//!
//! Removes the *contents* of the audit and quarantine directories without
//! deleting the directories themselves. The pipeline tolerates restarting
//! from empty stores: the next audit append reseeds the genesis hash.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::ExitCode;

#[derive(Args)]
pub struct ResetArgs {
    /// Root data directory holding `audit/` and `quarantine/`.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
}

pub fn execute(args: ResetArgs) -> anyhow::Result<ExitCode> {
    let audit_dir = args.data_dir.join("audit");
    let quarantine_dir = args.data_dir.join("quarantine");

    println!("Cleaning audit logs in: {}", audit_dir.display());
    clean_dir(&audit_dir)?;

    println!("Cleaning quarantine store in: {}", quarantine_dir.display());
    clean_dir(&quarantine_dir)?;

    println!("Cleanup complete. Stores are now empty.");
    Ok(ExitCode::Pass)
}

/// Removes all contents of a directory without deleting the directory
/// itself; creates it when missing.
fn clean_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating '{}'", dir.display()))?;
        return Ok(());
    }

    for entry in std::fs::read_dir(dir).with_context(|| format!("reading '{}'", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("removing '{}'", path.display()))?;
        } else {
            std::fs::remove_file(&path)
                .with_context(|| format!("removing '{}'", path.display()))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_dir_empties_but_keeps_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("audit");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("audit-log.jsonl"), "entry\n").unwrap();
        std::fs::write(dir.join("nested/file"), "x").unwrap();

        clean_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert!(std::fs::read_dir(&dir).unwrap().next().is_none());
    }

    #[test]
    fn clean_dir_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("quarantine");
        assert!(!dir.exists());

        clean_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn reset_clears_both_stores() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("data");
        std::fs::create_dir_all(data_dir.join("audit")).unwrap();
        std::fs::create_dir_all(data_dir.join("quarantine")).unwrap();
        std::fs::write(data_dir.join("audit/audit-log.jsonl"), "entry\n").unwrap();
        std::fs::write(data_dir.join("quarantine/abc.tar.gz"), "bundle").unwrap();

        let code = execute(ResetArgs {
            data_dir: data_dir.clone(),
        })
        .unwrap();
        assert_eq!(code, ExitCode::Pass);

        assert!(std::fs::read_dir(data_dir.join("audit")).unwrap().next().is_none());
        assert!(std::fs::read_dir(data_dir.join("quarantine")).unwrap().next().is_none());
    }
}
