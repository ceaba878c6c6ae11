//! CLI error types and exit codes

use carnet_engine::EngineError;
use carnet_source::SourceError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: Completed with record failures
/// - 3: Network error
/// - 4: Validation error
/// - 5: Directory error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Could not load the batch: {0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("{failed} record(s) failed; see the log above for details")]
    PartialFailure { failed: usize },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation(_) | CliError::Source(_) => 4,
            CliError::Engine(e) if e.is_transient() => 3,
            CliError::Engine(_) => 5,
            CliError::PartialFailure { .. } => 1,
        }
    }

    /// Print the error to stderr with a suggested action if available
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Source(SourceError::HeaderMismatch { .. }) => Some(
                "Check --delimiter against the export format, or map the columns with --mapping.",
            ),
            CliError::Engine(e) if e.is_transient() => {
                Some("The directory did not respond. Try again in a few moments.")
            }
            _ => None,
        }
    }
}
