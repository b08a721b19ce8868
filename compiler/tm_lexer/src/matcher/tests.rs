use super::*;
use pretty_assertions::assert_eq;
use tm_ir::{ByteRange, GrammarBuilder, Rule};
use tm_regex::RegexCache;
use tm_selector::ScopeSelectorWeigher;

use crate::test_grammars;

struct Env {
    regex: RegexCache,
    cache: MatchCache,
    cancel: CancellationToken,
}

impl Env {
    fn new() -> Self {
        Env {
            regex: RegexCache::new(),
            cache: MatchCache::new(),
            cancel: CancellationToken::new(),
        }
    }

    fn matcher<'a>(&'a self, grammar: &'a Grammar) -> RuleMatcher<'a> {
        RuleMatcher::new(grammar, &self.regex, &ScopeSelectorWeigher, &self.cache, &self.cancel)
    }
}

fn matched(rule: RuleId, start: usize, end: usize, priority: Priority) -> Frame {
    Frame {
        rule,
        match_data: MatchData::matched([Some(ByteRange::new(start, end))]),
        priority,
        line: None,
    }
}

// === Dominance ===

#[test]
fn matched_beats_unmatched() {
    let grammar = test_grammars::demo();
    let a = Frame::not_matched(RuleId::new(1));
    let b = matched(RuleId::new(2), 3, 4, Priority::Normal);
    assert_eq!(more_important(&grammar, a.clone(), b.clone()), b);
    assert_eq!(more_important(&grammar, b.clone(), a), b);
}

#[test]
fn earlier_start_wins() {
    let grammar = test_grammars::demo();
    let early = matched(RuleId::new(1), 1, 2, Priority::Normal);
    let late = matched(RuleId::new(2), 3, 9, Priority::High);
    assert_eq!(more_important(&grammar, late.clone(), early.clone()), early);
    assert_eq!(more_important(&grammar, early.clone(), late), early);
}

#[test]
fn equal_start_needs_higher_priority() {
    let grammar = test_grammars::demo();
    let first = matched(RuleId::new(1), 2, 3, Priority::Normal);
    let same = matched(RuleId::new(2), 2, 5, Priority::Normal);
    let high = matched(RuleId::new(3), 2, 3, Priority::High);
    assert_eq!(more_important(&grammar, first.clone(), same), first);
    assert_eq!(more_important(&grammar, first, high.clone()), high);
}

#[test]
fn empty_match_only_displaces_non_empty_when_it_opens_a_region() {
    let mut b = GrammarBuilder::new("source.t");
    let leaf = b.rule(Rule::matching("x*"));
    let region = b.rule(Rule::begin_end("(?:)", "y"));
    let grammar = b.build().unwrap();

    let wide = matched(leaf, 4, 6, Priority::Normal);
    let empty_leaf = matched(leaf, 2, 2, Priority::Normal);
    let empty_region = matched(region, 2, 2, Priority::Normal);
    assert_eq!(more_important(&grammar, wide.clone(), empty_leaf), wide);
    assert_eq!(more_important(&grammar, wide, empty_region.clone()), empty_region);

    // Empty displacing empty is fine
    let a = matched(leaf, 3, 3, Priority::Normal);
    let b = matched(leaf, 1, 1, Priority::Normal);
    assert_eq!(more_important(&grammar, a, b.clone()), b);
}

// === match_first ===

#[test]
fn leftmost_child_wins() {
    let grammar = test_grammars::demo();
    let env = Env::new();
    let line = LineText::new("x = 12 if\n");
    let scope = ScopePath::root("source.demo");
    let found = env
        .matcher(&grammar)
        .match_first(grammar.root(), &line, 0, Priority::Normal, &scope)
        .unwrap();
    assert_eq!(found.range(), Some(ByteRange::new(4, 6)));
    assert_eq!(
        grammar.rule(found.rule).name.as_deref(),
        Some("constant.numeric")
    );
    assert_eq!(found.line.as_ref(), Some(&line));
}

#[test]
fn declaration_order_breaks_ties() {
    let mut b = GrammarBuilder::new("source.t");
    let first = b.rule(Rule::matching("ab").with_name("first"));
    let second = b.rule(Rule::matching("abc").with_name("second"));
    let root = b.root();
    b.children(root, [first, second]);
    let grammar = b.build().unwrap();
    let env = Env::new();

    let found = env
        .matcher(&grammar)
        .match_first(root, &LineText::new("xabc\n"), 0, Priority::Normal, &ScopePath::root("source.t"))
        .unwrap();
    assert_eq!(found.rule, first);
}

#[test]
fn nothing_matches() {
    let grammar = test_grammars::demo();
    let env = Env::new();
    let found = env
        .matcher(&grammar)
        .match_first(grammar.root(), &LineText::new("x y z\n"), 0, Priority::Normal, &ScopePath::root("source.demo"))
        .unwrap();
    assert_eq!(found, Frame::not_matched(grammar.root()));
}

#[test]
fn grouping_rules_are_expanded() {
    let mut b = GrammarBuilder::new("source.t");
    let digit = b.rule(Rule::matching("[0-9]").with_name("digit"));
    let inner = b.rule(Rule::group());
    let outer = b.rule(Rule::group());
    b.children(inner, [digit]).children(outer, [inner]);
    let root = b.root();
    b.children(root, [outer]);
    let grammar = b.build().unwrap();
    let env = Env::new();

    let found = env
        .matcher(&grammar)
        .match_first(root, &LineText::new("ab7\n"), 0, Priority::Normal, &ScopePath::root("source.t"))
        .unwrap();
    assert_eq!(found.rule, digit);
    assert_eq!(found.range(), Some(ByteRange::new(2, 3)));
}

#[test]
fn self_including_group_terminates() {
    let mut b = GrammarBuilder::new("source.t");
    let word = b.rule(Rule::matching("\\w+"));
    let group = b.rule(Rule::group());
    b.children(group, [group, word]);
    let root = b.root();
    b.children(root, [group]);
    let grammar = b.build().unwrap();
    let env = Env::new();

    let found = env
        .matcher(&grammar)
        .match_first(root, &LineText::new("  hi\n"), 0, Priority::Normal, &ScopePath::root("source.t"))
        .unwrap();
    assert_eq!(found.rule, word);
}

#[test]
fn deeply_nested_groups_do_not_overflow() {
    let mut b = GrammarBuilder::new("source.t");
    let leaf = b.rule(Rule::matching("z"));
    let mut below = leaf;
    for _ in 0..5_000 {
        let group = b.rule(Rule::group());
        b.children(group, [below]);
        below = group;
    }
    let root = b.root();
    b.children(root, [below]);
    let grammar = b.build().unwrap();
    let env = Env::new();

    let found = env
        .matcher(&grammar)
        .match_first(root, &LineText::new("az\n"), 0, Priority::Normal, &ScopePath::root("source.t"))
        .unwrap();
    assert_eq!(found.rule, leaf);
}

#[test]
fn end_only_children_never_match() {
    let mut b = GrammarBuilder::new("source.t");
    let end_only = b.rule(Rule::end_only("a"));
    let root = b.root();
    b.children(root, [end_only]);
    let grammar = b.build().unwrap();
    let env = Env::new();

    let found = env
        .matcher(&grammar)
        .match_first(root, &LineText::new("a\n"), 0, Priority::Normal, &ScopePath::root("source.t"))
        .unwrap();
    assert!(!found.is_matched());
}

// === Injections ===

fn injected_grammar(selector: &str) -> (Grammar, RuleId, RuleId) {
    let mut b = GrammarBuilder::new("source.host");
    let native = b.rule(Rule::matching("@\\w+").with_name("host.at"));
    let foreign = b.rule(Rule::matching("@\\w+").with_name("inj.at"));
    let injected = b.rule(Rule::group());
    b.children(injected, [foreign]);
    let root = b.root();
    b.children(root, [native]).inject(root, selector, injected);
    (b.build().unwrap(), native, foreign)
}

#[test]
fn injection_priority_breaks_equal_start() {
    let line = LineText::new("x @a\n");
    let scope = ScopePath::root("source.host");

    let (grammar, _, foreign) = injected_grammar("L:source.host");
    let env = Env::new();
    let found = env
        .matcher(&grammar)
        .match_first(grammar.root(), &line, 0, Priority::Normal, &scope)
        .unwrap();
    assert_eq!(found.rule, foreign);
    assert_eq!(found.priority, Priority::High);

    let (grammar, native, _) = injected_grammar("source.host");
    let found = env
        .matcher(&grammar)
        .match_first(grammar.root(), &line, 0, Priority::Normal, &scope)
        .unwrap();
    assert_eq!(found.rule, native);
}

#[test]
fn non_applying_injection_is_skipped() {
    let (grammar, native, _) = injected_grammar("L:source.other");
    let env = Env::new();
    let found = env
        .matcher(&grammar)
        .match_first(grammar.root(), &LineText::new("@a\n"), 0, Priority::Normal, &ScopePath::root("source.host"))
        .unwrap();
    assert_eq!(found.rule, native);
}

// === Cache ===

#[test]
fn results_are_memoized() {
    let grammar = test_grammars::demo();
    let env = Env::new();
    let line = LineText::new("if 1\n");
    let scope = ScopePath::root("source.demo");
    let matcher = env.matcher(&grammar);

    let first = matcher.match_first(grammar.root(), &line, 0, Priority::Normal, &scope).unwrap();
    assert_eq!(env.cache.len(), 1);
    let second = matcher.match_first(grammar.root(), &line, 0, Priority::Normal, &scope).unwrap();
    assert_eq!(first, second);
    assert_eq!(env.cache.len(), 1);

    matcher.match_first(grammar.root(), &line, 2, Priority::Normal, &scope).unwrap();
    assert_eq!(env.cache.len(), 2);
}

// === String patterns ===

#[test]
fn end_pattern_uses_captured_text() {
    let mut b = GrammarBuilder::new("source.t");
    let heredoc = b.rule(Rule::begin_end("<<(\\w+)", "^\\1$"));
    let grammar = b.build().unwrap();
    let env = Env::new();
    let matcher = env.matcher(&grammar);

    let opening = LineText::new("x <<EOF\n");
    let frame = Frame {
        rule: heredoc,
        match_data: env.regex.search("<<(\\w+)", &opening, 0, &env.cancel).unwrap(),
        priority: Priority::Normal,
        line: Some(opening),
    };

    let closing = LineText::new("EOF\n");
    let end = matcher.match_string_pattern(PatternKind::End, &closing, 0, &frame).unwrap();
    assert_eq!(end.range(), Some(ByteRange::new(0, 3)));

    let other = LineText::new("EOFX\n");
    assert!(!matcher.match_string_pattern(PatternKind::End, &other, 0, &frame).unwrap().is_matched());
}

#[test]
fn missing_string_pattern_never_matches() {
    let grammar = test_grammars::demo();
    let env = Env::new();
    let frame = Frame::not_matched(grammar.root());
    let data = env
        .matcher(&grammar)
        .match_string_pattern(PatternKind::While, &LineText::new("a\n"), 0, &frame)
        .unwrap();
    assert!(!data.is_matched());
}

// === Errors ===

#[test]
fn invalid_child_pattern_is_an_error() {
    let mut b = GrammarBuilder::new("source.t");
    let broken = b.rule(Rule::matching("("));
    let root = b.root();
    b.children(root, [broken]);
    let grammar = b.build().unwrap();
    let env = Env::new();

    let err = env
        .matcher(&grammar)
        .match_first(root, &LineText::new("(\n"), 0, Priority::Normal, &ScopePath::root("source.t"))
        .unwrap_err();
    assert!(matches!(err, MatchError::InvalidPattern { .. }));
    assert!(env.cache.is_empty());
}

#[test]
fn cancellation_stops_matching() {
    let grammar = test_grammars::demo();
    let env = Env::new();
    env.cancel.cancel();
    let err = env
        .matcher(&grammar)
        .match_first(grammar.root(), &LineText::new("if\n"), 0, Priority::Normal, &ScopePath::root("source.demo"))
        .unwrap_err();
    assert_eq!(err, MatchError::Cancelled);
}
