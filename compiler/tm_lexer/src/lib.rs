//! Incremental, grammar-driven line lexer.
//!
//! A [`Lexer`] walks a document one line at a time, driving a stack of
//! active begin/end regions over a [`Grammar`](tm_ir::Grammar) and emitting
//! [`Token`](tm_ir::Token)s labelled with hierarchical scope paths. The
//! state after any line ([`LexState`]) can be captured and handed back to
//! [`Lexer::init`] to resume lexing from that line, which is what lets an
//! editor re-lex only the lines following an edit.
//!
//! # Layers
//!
//! - [`RuleMatcher`]: picks the winning candidate among a rule's children
//!   and applicable injections at a byte offset
//! - [`MatchCache`]: process-wide memo of [`RuleMatcher::match_first`]
//! - [`Lexer`]: the line scanner plus session bookkeeping
//!
//! # Tracing
//!
//! Set `RUST_LOG=tm_lexer=debug` and call [`init_tracing`] to see loop
//! guard trips, while-region evictions and line-limit truncation.

mod backref;
mod cache;
mod captures;
mod config;
mod error;
mod matcher;
mod scanner;
mod session;
mod stack;

#[cfg(test)]
mod test_grammars;

pub use backref::{resolve, BackReference};
pub use cache::{MatchCache, MatchKey};
pub use captures::{order_captures, CaptureEvent};
pub use config::{LexerConfig, DEFAULT_LOOP_BOUND};
pub use error::LexError;
pub use matcher::{more_important, RuleMatcher};
pub use session::{LexState, Lexer};

pub use tm_regex::CancellationToken;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize the tracing subscriber.
///
/// Call once at startup. Controlled by `RUST_LOG` environment variable:
/// - `RUST_LOG=tm_lexer=debug` - guard trips and region evictions
/// - `RUST_LOG=tm_lexer=trace` - every cache hit and line scan
///
/// Does nothing if `RUST_LOG` is unset or a global subscriber already exists.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // A host application may have installed its own subscriber.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
