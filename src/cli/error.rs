//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::StorageError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("{0}")]
    Usage(String),

    #[error("integrity check failed: {0} violation(s)")]
    IntegrityViolations(usize),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        use crate::exitcode;

        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::IntegrityViolations(_) => exitcode::DATAERR,
            CliError::Application(e) => match e {
                ApplicationError::Domain(DomainError::NotFound(_)) => exitcode::NOINPUT,
                ApplicationError::Domain(
                    DomainError::AlreadyExists(_) | DomainError::HasChildren { .. },
                ) => exitcode::CANTCREAT,
                ApplicationError::Domain(_) => exitcode::DATAERR,
                ApplicationError::Config { .. } => exitcode::CONFIG,
                ApplicationError::Closed => exitcode::UNAVAILABLE,
                ApplicationError::Storage { source, .. } => match source {
                    StorageError::Io { .. } => exitcode::IOERR,
                    StorageError::Unreachable { .. } => exitcode::UNAVAILABLE,
                    StorageError::InvalidDescriptor(_) => exitcode::CONFIG,
                    StorageError::Serialization { .. } | StorageError::Integrity { .. } => {
                        exitcode::DATAERR
                    }
                    _ => exitcode::SOFTWARE,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeId;
    use crate::exitcode;
    use rstest::rstest;

    #[rstest]
    #[case(ApplicationError::Domain(DomainError::NotFound(NodeId(1))), exitcode::NOINPUT)]
    #[case(ApplicationError::Domain(DomainError::AlreadyExists(NodeId(1))), exitcode::CANTCREAT)]
    #[case(ApplicationError::Domain(DomainError::NoRoot), exitcode::DATAERR)]
    #[case(ApplicationError::Closed, exitcode::UNAVAILABLE)]
    fn given_application_error_when_exit_code_then_maps(
        #[case] error: ApplicationError,
        #[case] expected: i32,
    ) {
        assert_eq!(CliError::from(error).exit_code(), expected);
    }

    #[rstest]
    #[case(CliError::Usage("no command".to_string()), exitcode::USAGE)]
    #[case(CliError::IntegrityViolations(2), exitcode::DATAERR)]
    fn given_cli_error_when_exit_code_then_maps(#[case] error: CliError, #[case] expected: i32) {
        assert_eq!(error.exit_code(), expected);
    }

    #[test]
    fn given_unreachable_store_when_exit_code_then_unavailable() {
        let error = CliError::Application(ApplicationError::Storage {
            operation: "open",
            id: None,
            source: StorageError::Unreachable {
                descriptor: "file:/nope/forest.toml".to_string(),
                reason: "directory does not exist: /nope".to_string(),
            },
        });
        assert_eq!(error.exit_code(), exitcode::UNAVAILABLE);
    }
}
