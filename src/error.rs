use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::cli::CliError;

/// Unified error type for the generator's outer layers.
///
/// Per-interface generation problems are [`crate::diagnostics::GenerationError`]s; they
/// surface here only as the aggregate [`Error::Generation`] count.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Cli(CliError),
    Manifest {
        path: PathBuf,
        message: String,
    },
    /// The run finished but `failed` of `total` interfaces did not reach `Done`.
    Generation {
        failed: usize,
        total: usize,
    },
    Internal {
        message: String,
        backtrace: Option<Backtrace>,
    },
}

/// Convenience result alias used across the generator.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn manifest(path: &Path, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Construct a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: capture_backtrace(),
        }
    }

    /// Return the captured backtrace, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            Error::Internal { backtrace, .. } => backtrace.as_ref(),
            _ => None,
        }
    }
}

fn capture_backtrace() -> Option<Backtrace> {
    if cfg!(debug_assertions) {
        Some(Backtrace::force_capture())
    } else {
        None
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Cli(err) => write!(f, "{err}"),
            Error::Manifest { path, message } => {
                write!(f, "manifest error in {}: {message}", path.display())
            }
            Error::Generation { failed, total } => {
                write!(f, "generation failed for {failed} of {total} interface(s)")
            }
            Error::Internal { message, .. } => write!(f, "internal error: {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Cli(err) => Some(err),
            Error::Manifest { .. } | Error::Generation { .. } | Error::Internal { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<CliError> for Error {
    fn from(error: CliError) -> Self {
        Error::Cli(error)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::internal(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_variants() {
        let io_error = Error::from(io::Error::other("disk error"));
        assert_eq!(io_error.to_string(), "I/O error: disk error");

        let cli_error = Error::from(CliError::new("bad args"));
        assert_eq!(cli_error.to_string(), "bad args");

        let manifest = Error::manifest(Path::new("natbind.yaml"), "unknown field `foo`");
        assert_eq!(
            manifest.to_string(),
            "manifest error in natbind.yaml: unknown field `foo`"
        );

        let generation = Error::Generation {
            failed: 2,
            total: 5,
        };
        assert_eq!(
            generation.to_string(),
            "generation failed for 2 of 5 interface(s)"
        );

        let internal_error = Error::internal("panic");
        assert_eq!(internal_error.to_string(), "internal error: panic");
    }

    #[test]
    fn source_exposes_wrapped_errors() {
        let io_error = Error::from(io::Error::other("boom"));
        let source = io_error.source().unwrap();
        assert!(source.downcast_ref::<io::Error>().is_some());

        let cli_error = Error::from(CliError::new("oops"));
        let source = cli_error.source().unwrap();
        assert!(source.downcast_ref::<CliError>().is_some());

        assert!(Error::internal("internal").source().is_none());
        assert!(
            Error::Generation {
                failed: 1,
                total: 1
            }
            .source()
            .is_none()
        );
    }

    #[test]
    fn debug_builds_capture_backtrace() {
        if cfg!(debug_assertions) {
            let err = Error::internal("capture");
            assert!(err.backtrace().is_some());
        }
    }
}
