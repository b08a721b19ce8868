//! Grammars and helpers shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a subset")]

use std::sync::Arc;

use tm_ir::{CaptureKind, Grammar, GrammarBuilder, Rule, Token};
use tm_lexer::{CancellationToken, LexState, Lexer, LexerConfig, MatchCache};

/// A C-like toy language: line and block comments, strings with escapes,
/// keywords and numbers.
pub fn demo() -> Arc<Grammar> {
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

/// A grammar full of rules that match the empty string: an unconditional
/// `x*` and a zero-width region at every word boundary that nests itself.
pub fn pathological() -> Arc<Grammar> {
    let mut b = GrammarBuilder::new("source.bad");
    let empty = b.rule(Rule::matching("x*").with_name("empty"));
    let nest = b.rule(Rule::begin_end("\\b", "\\)").with_name("nest"));
    let word = b.rule(Rule::matching("[a-z]+").with_name("word"));
    b.children(nest, [nest, word]);
    let root = b.root();
    b.children(root, [nest, word, empty]);
    Arc::new(b.build().unwrap())
}

/// Markdown-like fenced blocks with an injected grammar inside the fence.
///
/// The fence's own child marks lowercase words; the injection, weighed
/// with `selector`, marks `const`/`let` and `=`.
pub fn fenced(selector: &str) -> Arc<Grammar> {
    let mut b = GrammarBuilder::new("text.md");
    let fence = b.rule(
        Rule::begin_end("^```", "^```")
            .with_name("markup.fenced")
            .with_content_name("markup.raw"),
    );
    let word = b.rule(Rule::matching("[a-z]+").with_name("markup.raw.word"));
    b.children(fence, [word]);

    let keyword = b.rule(Rule::matching("\\b(const|let)\\b").with_name("keyword.js"));
    let operator = b.rule(Rule::matching("=").with_name("keyword.operator.js"));
    let embedded = b.rule(Rule::group());
    b.children(embedded, [keyword, operator]);
    b.inject(fence, selector, embedded);

    let root = b.root();
    b.children(root, [fence]);
    Arc::new(b.build().unwrap())
}

/// Tags with attributes, where begin, end and match captures overlap the
/// whole match, plus a quote that only captures its opening mark.
pub fn markup() -> Arc<Grammar> {
    let mut b = GrammarBuilder::new("text.ml");
    let tag = b.rule(
        Rule::begin_end("(<)(\\w+)", "(/)?(>)")
            .with_name("meta.tag.$2")
            .with_capture(CaptureKind::Begin, 0, "punctuation.definition.tag.begin")
            .with_capture(CaptureKind::Begin, 2, "entity.name.tag")
            .with_capture(CaptureKind::End, 0, "punctuation.definition.tag.end")
            .with_capture(CaptureKind::End, 1, "punctuation.definition.tag.self-closing"),
    );
    let attribute = b.rule(
        Rule::matching("(\\w+)(=)(\"[^\"]*\")")
            .with_capture(CaptureKind::Generic, 0, "meta.attribute")
            .with_capture(CaptureKind::Generic, 1, "entity.other.attribute-name")
            .with_capture(CaptureKind::Generic, 2, "punctuation.separator.key-value")
            .with_capture(CaptureKind::Generic, 3, "string.quoted"),
    );
    b.children(tag, [attribute]);
    let quote = b.rule(
        Rule::begin_end("'", "'")
            .with_name("string.single")
            .with_capture(CaptureKind::Begin, 0, "punctuation.quote"),
    );
    let root = b.root();
    b.children(root, [tag, quote]);
    Arc::new(b.build().unwrap())
}

pub fn lexer(grammar: &Arc<Grammar>, cache: Arc<MatchCache>) -> Lexer {
    Lexer::new(Arc::clone(grammar), LexerConfig::default()).with_cache(cache)
}

/// Lex all of `text` with a private cache.
pub fn lex(grammar: &Arc<Grammar>, text: &str) -> Vec<Token> {
    lex_with(grammar, text, Arc::new(MatchCache::new()))
}

pub fn lex_with(grammar: &Arc<Grammar>, text: &str, cache: Arc<MatchCache>) -> Vec<Token> {
    let mut lexer = lexer(grammar, cache);
    lexer.init(text, 0, None).unwrap();
    lexer.tokenize_to_end(&CancellationToken::new()).unwrap()
}

/// Lex `text` line by line, recording (offset, state, tokens so far)
/// before every line.
pub fn lex_with_checkpoints(
    grammar: &Arc<Grammar>,
    text: &str,
) -> (Vec<Token>, Vec<(usize, LexState, usize)>) {
    let mut lexer = lexer(grammar, Arc::new(MatchCache::new()));
    lexer.init(text, 0, None).unwrap();
    let cancel = CancellationToken::new();
    let mut tokens = Vec::new();
    let mut checkpoints = Vec::new();
    while !lexer.is_finished() {
        checkpoints.push((lexer.current_offset(), lexer.snapshot(), tokens.len()));
        lexer.advance_line(&mut tokens, &cancel).unwrap();
    }
    (tokens, checkpoints)
}

/// Lex `text` line by line, returning each line's tokens with the state
/// saved after it.
pub fn lex_by_line(grammar: &Arc<Grammar>, text: &str) -> Vec<(Vec<Token>, LexState)> {
    let mut lexer = lexer(grammar, Arc::new(MatchCache::new()));
    lexer.init(text, 0, None).unwrap();
    let cancel = CancellationToken::new();
    let mut lines = Vec::new();
    while !lexer.is_finished() {
        let mut tokens = Vec::new();
        lexer.advance_line(&mut tokens, &cancel).unwrap();
        lines.push((tokens, lexer.snapshot()));
    }
    lines
}

/// Panics unless every scope path hangs off the grammar's root and each
/// pair of consecutive paths meets at a common ancestor, so that one turns
/// into the other by closing back to that ancestor and then opening.
pub fn assert_well_nested(grammar: &Grammar, tokens: &[Token]) {
    for token in tokens {
        let root = token.scope.iter().last().unwrap();
        assert!(root.is_root(), "{token:?}");
        assert_eq!(root.name(), Some(grammar.scope_name()), "{token:?}");
    }
    for pair in tokens.windows(2) {
        let (before, after) = (&pair[0].scope, &pair[1].scope);
        let common = after
            .iter()
            .find(|ancestor| before.iter().any(|other| other == *ancestor))
            .unwrap_or_else(|| panic!("{before} and {after} share no ancestor"));
        assert!(common.depth() <= before.depth() && common.depth() <= after.depth());
        assert_eq!(
            before.iter().nth(before.depth() - common.depth()),
            Some(common),
            "{common} is not a prefix of {before}"
        );
        assert_eq!(
            after.iter().nth(after.depth() - common.depth()),
            Some(common),
            "{common} is not a prefix of {after}"
        );
    }
}

/// Tokens as `(start, end, "scope path")`.
pub fn render(tokens: &[Token]) -> Vec<(usize, usize, String)> {
    tokens
        .iter()
        .map(|token| (token.start, token.end, token.scope.to_string()))
        .collect()
}

pub fn tok(start: usize, end: usize, scope: &str) -> (usize, usize, String) {
    (start, end, scope.to_string())
}

/// Panics unless `tokens` are non-empty, ordered and cover `0..len` without
/// gaps.
pub fn assert_covers(tokens: &[Token], len: usize) {
    let mut expected_start = 0;
    for token in tokens {
        assert!(!token.is_empty(), "empty token {token:?}");
        assert_eq!(token.start, expected_start, "gap or overlap at {token:?}");
        expected_start = token.end;
    }
    assert_eq!(expected_start, len, "tokens stop short of the text end");
}
