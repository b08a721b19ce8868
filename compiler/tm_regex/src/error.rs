//! Errors surfaced by the regex capability.

/// Failure of a single search.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// The pattern does not compile. Grammars are not validated up front,
    /// so this surfaces on first use.
    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: Box<str>, message: String },

    /// The caller's cancellation token fired.
    #[error("matching was cancelled")]
    Cancelled,
}
