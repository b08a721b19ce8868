//! Regex capability for the scope lexer.
//!
//! The lexer treats regex matching as a black box: compile a pattern, search
//! a line's bytes from a start offset, report per-group byte ranges. This
//! crate defines that seam ([`RegexEngine`]) and ships the default engine
//! ([`RegexCache`]), backed by `regex::bytes` with a sharded compile cache.
//!
//! Long-running work cooperates with a caller-owned [`CancellationToken`].

mod cancel;
mod engine;
mod error;

pub use cancel::CancellationToken;
pub use engine::{escape, RegexCache, RegexEngine};
pub use error::MatchError;
