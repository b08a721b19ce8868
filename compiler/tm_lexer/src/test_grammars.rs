//! Small grammars shared by unit tests.

use std::sync::Arc;

use tm_ir::{CaptureKind, Grammar, GrammarBuilder, Rule, Token};

/// A C-like toy language.
///
/// Root children, in order: line comment, block comment, string (with
/// escapes and begin/end quote captures), keyword, number.
pub(crate) fn demo() -> Arc<Grammar> {
    let mut b = GrammarBuilder::new("source.demo");
    let line_comment = b.rule(Rule::matching("//.*$").with_name("comment.line"));
    let block_comment = b.rule(Rule::begin_end("/\\*", "\\*/").with_name("comment.block"));
    let escape = b.rule(Rule::matching("\\\\.").with_name("constant.character.escape"));
    let string = b.rule(
        Rule::begin_end("(\")", "(\")")
            .with_name("string.quoted.double")
            .with_capture(CaptureKind::Begin, 1, "punctuation.definition.string.begin")
            .with_capture(CaptureKind::End, 1, "punctuation.definition.string.end"),
    );
    b.children(string, [escape]);
    let keyword = b.rule(Rule::matching("\\b(if|else|while)\\b").with_name("keyword.control.$1"));
    let number = b.rule(Rule::matching("\\b[0-9]+\\b").with_name("constant.numeric"));
    let root = b.root();
    b.children(root, [line_comment, block_comment, string, keyword, number]);
    Arc::new(b.build().unwrap())
}

/// Tokens as `(start, end, "scope path")` for readable assertions.
pub(crate) fn render(tokens: &[Token]) -> Vec<(usize, usize, String)> {
    tokens
        .iter()
        .map(|token| (token.start, token.end, token.scope.to_string()))
        .collect()
}
