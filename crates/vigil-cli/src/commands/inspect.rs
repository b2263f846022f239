//! `vigil inspect` -- verify and summarize an evidence bundle archive.

use std::path::PathBuf;

use clap::Args;

use vigil_quarantine::verify_bundle_archive;

use crate::ExitCode;

#[derive(Args)]
pub struct InspectArgs {
    /// Path of the `<bundle_id>.tar.gz` evidence bundle.
    #[arg(long)]
    pub bundle: PathBuf,
}

pub fn execute(args: InspectArgs) -> anyhow::Result<ExitCode> {
    match verify_bundle_archive(&args.bundle) {
        Ok(bundle) => {
            println!("bundle OK: {}", bundle.bundle_id);
            println!("  document_id : {}", bundle.document_id);
            println!("  decision    : {}", bundle.decision);
            println!("  reason      : {}", bundle.reason);
            println!("  created_at  : {}", bundle.created_at);
            println!("  entries     : {}", bundle.manifest.files.len());
            println!("  has_scores  : {}", bundle.semantic_score.is_some());
            Ok(ExitCode::Pass)
        }
        Err(err) => {
            eprintln!("bundle verification failed: {err}");
            Ok(ExitCode::IntegrityViolation)
        }
    }
}
