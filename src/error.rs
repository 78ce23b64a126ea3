use thiserror::Error;

/// Component-level error taxonomy. Everything carries a human-readable
/// message so the presentation layer can render it without knowing any
/// network internals. Partial batch failures and degraded catalogs are
/// data, not errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed input caught before any network call.
    #[error("{0}")]
    Validation(String),

    /// The remote call itself failed: network unreachable, or a non-2xx
    /// response. The message prefers the body's `error`/`detail` field
    /// when one is present.
    #[error("{0}")]
    Transport(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        CoreError::Transport(msg.into())
    }
}
