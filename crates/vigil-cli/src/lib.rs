//! Vigil CLI -- command-line interface for the document-admission pipeline.
//!
//! This crate provides the CLI entry point, argument parsing, exit code
//! definitions, and the glue that ties together lineage verification,
//! semantic scanning, quarantine, and audit logging.

use std::fmt;

pub mod commands;

// ---------------------------------------------------------------------------
// Exit Codes
// ---------------------------------------------------------------------------

/// Vigil process exit codes.
///
/// These exit codes allow CI/CD pipelines and shell scripts to distinguish
/// between termination reasons without parsing output.
///
/// | Code | Meaning                                          |
/// |------|--------------------------------------------------|
/// | 0    | Command completed, all checks passed              |
/// | 1    | Integrity violation (broken chain or bundle)      |
/// | 2    | Engine error (processing failure, internal error) |
/// | 3    | Configuration error                               |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    /// Command completed, all checks passed.
    Pass = 0,
    /// A hash chain or evidence bundle failed verification.
    IntegrityViolation = 1,
    /// Engine error (processing failure, internal error).
    EngineError = 2,
    /// Configuration error (missing config, invalid YAML, bad keys).
    ConfigError = 3,
}

impl ExitCode {
    /// Returns the numeric exit code as a `u8`.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns all exit code variants.
    #[must_use]
    pub const fn all() -> &'static [ExitCode] {
        &[
            Self::Pass,
            Self::IntegrityViolation,
            Self::EngineError,
            Self::ConfigError,
        ]
    }

    /// Returns a human-readable description of this exit code.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pass => "command completed, all checks passed",
            Self::IntegrityViolation => "integrity violation (broken chain or bundle)",
            Self::EngineError => "engine error (processing failure, internal error)",
            Self::ConfigError => "configuration error (missing config, invalid YAML, bad keys)",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {} ({})", self.as_u8(), self.description())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}

/// Terminate the process with the given [`ExitCode`].
///
/// Logs the exit reason (info for [`ExitCode::Pass`], error otherwise) and
/// returns the corresponding [`std::process::ExitCode`] suitable as a `main`
/// return value.
pub fn terminate(code: ExitCode) -> std::process::ExitCode {
    match code {
        ExitCode::Pass => {
            tracing::info!(%code, "vigil exiting");
        }
        _ => {
            tracing::error!(%code, "vigil exiting with error");
        }
    }
    code.into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
