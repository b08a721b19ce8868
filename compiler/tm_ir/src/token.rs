//! Lexer output.

use crate::ScopePath;

/// A scoped span of the document.
///
/// Offsets are document-relative bytes, `[start, end)`, and never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub scope: ScopePath,
    pub start: usize,
    pub end: usize,
    /// The scope path was the grammar root when this token was emitted.
    /// Lexing may resume right after such a token without earlier lines.
    pub restartable: bool,
}

impl Token {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}
