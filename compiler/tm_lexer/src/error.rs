//! Errors surfaced by a lexing session.

use tm_ir::RuleId;
use tm_regex::MatchError;

/// Failure of a lexing session.
///
/// Pathological grammars (empty-match loops, self-recursive groups) are not
/// errors: they are absorbed by the loop guards and produce tokens anyway.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    /// A grammar pattern, after back-reference substitution, did not compile.
    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: Box<str>, message: String },

    /// The session's cancellation token fired.
    #[error("lexing was cancelled")]
    Cancelled,

    /// The session was started at an offset that splits a UTF-8 character.
    #[error("offset {0} is not on a character boundary")]
    OffsetNotOnCharBoundary(usize),

    /// A saved state refers to a rule the session's grammar does not have.
    #[error("saved state refers to unknown rule {0:?}")]
    UnknownRule(RuleId),
}

impl LexError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LexError::Cancelled)
    }
}

impl From<MatchError> for LexError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidPattern { pattern, message } => {
                LexError::InvalidPattern { pattern, message }
            }
            MatchError::Cancelled => LexError::Cancelled,
        }
    }
}
