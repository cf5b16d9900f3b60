use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all keel operations.
#[derive(Debug, Error, Diagnostic)]
pub enum KeelError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid settings: bad declarations, duplicate names, malformed rules.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check your keel.toml settings file"))]
    Configuration { message: String },

    /// A regexp or glob pattern failed to compile.
    #[error("Invalid {kind} pattern '{pattern}': {message}")]
    InvalidPattern {
        kind: String,
        pattern: String,
        message: String,
    },

    /// A caller passed a value the operation cannot accept.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Competing candidates diverge beyond what the conflict policy allows.
    #[error("{message}")]
    #[diagnostic(help("Pin a single revision or choose a less strict conflict manager"))]
    StrictConflict { message: String },

    /// Malformed identifier or document.
    #[error("Parse error: {message}")]
    Parse { message: String },
}

/// Convenience alias for results carrying a [`KeelError`].
pub type KeelResult<T> = Result<T, KeelError>;
