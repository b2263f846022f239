use clap::{Parser, Subcommand};

use vigil_cli::commands;

/// Vigil -- staged document-admission pipeline for RAG ingestion.
#[derive(Parser)]
#[command(name = "vigil", about = "Vigil -- staged document-admission pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in attack-simulation scenarios through the pipeline.
    Run(commands::run::RunArgs),
    /// Verify the hash-chained audit log.
    Audit(commands::audit::AuditArgs),
    /// Verify an evidence bundle archive.
    Inspect(commands::inspect::InspectArgs),
    /// Clear the audit log and quarantine store.
    Reset(commands::reset::ResetArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Audit(args) => commands::audit::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::Reset(args) => commands::reset::execute(args),
    };

    match result {
        Ok(code) => vigil_cli::terminate(code),
        Err(err) => {
            eprintln!("vigil: error: {err:#}");
            vigil_cli::terminate(vigil_cli::ExitCode::EngineError)
        }
    }
}
