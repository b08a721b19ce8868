use super::*;
use pretty_assertions::assert_eq;
use tm_ir::ByteRange;

/// Match data for "foo bar" with group 1 = "foo", group 2 = "bar".
fn foo_bar() -> (LineText, MatchData) {
    let line = LineText::new("foo bar\n");
    let data = MatchData::matched([
        Some(ByteRange::new(0, 7)),
        Some(ByteRange::new(0, 3)),
        Some(ByteRange::new(4, 7)),
    ]);
    (line, data)
}

#[test]
fn substitutes_existing_groups_and_keeps_missing_ones() {
    let (line, data) = foo_bar();
    assert_eq!(
        resolve("\\1-\\2", Some(&line), &data, BackReference::Regex),
        "foo-bar"
    );
    assert_eq!(
        resolve("\\3", Some(&line), &data, BackReference::Regex),
        "\\3"
    );
}

#[test]
fn scope_references_use_dollar() {
    let (line, data) = foo_bar();
    assert_eq!(
        resolve("keyword.$1.$2", Some(&line), &data, BackReference::Scope),
        "keyword.foo.bar"
    );
    // Regex-style references are not touched in scope names
    assert_eq!(
        resolve("a\\1", Some(&line), &data, BackReference::Scope),
        "a\\1"
    );
}

#[test]
fn longest_digit_run_names_the_group() {
    let (line, data) = foo_bar();
    // Group 12 does not exist, so the reference stays as written
    assert_eq!(
        resolve("\\12", Some(&line), &data, BackReference::Regex),
        "\\12"
    );
}

#[test]
fn regex_substitution_is_escaped() {
    let line = LineText::new("<<a.b\n");
    let data = MatchData::matched([Some(ByteRange::new(0, 5)), Some(ByteRange::new(2, 5))]);
    assert_eq!(
        resolve("^\\1$", Some(&line), &data, BackReference::Regex),
        "^a\\.b$"
    );
    assert_eq!(
        resolve("heredoc.$1", Some(&line), &data, BackReference::Scope),
        "heredoc.a.b"
    );
}

#[test]
fn non_participating_group_is_kept() {
    let line = LineText::new("x\n");
    let data = MatchData::matched([Some(ByteRange::new(0, 1)), None]);
    assert_eq!(
        resolve("\\1", Some(&line), &data, BackReference::Regex),
        "\\1"
    );
}

#[test]
fn unchanged_without_source_or_match() {
    let (line, data) = foo_bar();
    assert!(matches!(
        resolve("\\1", None, &data, BackReference::Regex),
        Cow::Borrowed("\\1")
    ));
    assert!(matches!(
        resolve("\\1", Some(&line), &MatchData::not_matched(), BackReference::Regex),
        Cow::Borrowed("\\1")
    ));
    assert!(matches!(
        resolve("plain", Some(&line), &data, BackReference::Regex),
        Cow::Borrowed("plain")
    ));
}

#[test]
fn trailing_prefix_is_literal() {
    let (line, data) = foo_bar();
    assert_eq!(resolve("a$", Some(&line), &data, BackReference::Scope), "a$");
}
