//! Shared value types for the grammar-driven scope lexer.
//!
//! This crate contains the data every other layer agrees on:
//! - [`ScopePath`]: persistent, structurally-hashed scope cons-list
//! - [`LineText`], [`MatchData`], [`ByteRange`]: what the regex capability
//!   consumes and produces
//! - [`Frame`], [`FrameStack`]: the automaton state between matches
//! - [`Token`]: lexer output
//! - [`Grammar`], [`Rule`], [`GrammarBuilder`]: the immutable rule arena
//!
//! # Design Philosophy
//!
//! - **Arena everything**: rules are addressed by [`RuleId`], so recursive
//!   grammars are plain indices rather than ownership cycles.
//! - **Share, don't copy**: scope paths and frame stacks are `Arc`-linked,
//!   so snapshotting state is a pointer clone.
//! - **Hash once**: persistent nodes cache their structural hash, keeping
//!   cache keys and loop-detection snapshots O(1) to hash.

mod frame;
mod grammar;
mod line;
mod scope;
mod token;

pub use frame::{Frame, FrameStack, Priority};
pub use grammar::{
    CaptureKind, CaptureMap, Grammar, GrammarBuilder, GrammarError, GrammarId, Injection,
    PatternKind, Patterns, Rule, RuleId,
};
pub use line::{ByteRange, LineText, MatchData};
pub use scope::ScopePath;
pub use token::Token;
