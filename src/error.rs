//! Error types for verification-gate.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by tasks, checkers, caches and the gate.
#[derive(Debug, Error)]
pub enum Error {
    /// A task could not be turned into a concrete, dereferenceable target.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// A checker's one-time initialization failed.
    #[error("failed to initialize checker {checker}: {source}")]
    CheckerInit {
        /// Name of the checker that failed.
        checker: &'static str,
        /// Underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// A remote service explicitly rejected the configured credential.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// Network or timeout failure talking to an external service.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Catch-all verification failure surfaced to the gate's error hook.
    #[error("verification error: {0}")]
    Verification(String),

    /// Cache adapter failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// Privileged lookup context failure.
    #[error("platform api error: {0}")]
    Api(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an initialization failure with the name of the checker.
    #[must_use]
    pub fn checker_init(checker: &'static str, source: Self) -> Self {
        Self::CheckerInit {
            checker,
            source: Box::new(source),
        }
    }
}
