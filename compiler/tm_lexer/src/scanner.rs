//! Per-line scanning.
//!
//! The scanner owns the parse state carried from line to line and turns the
//! matcher's answers into stack transitions and tokens. Scope bookkeeping
//! mirrors the frame stack: every pushed frame opens two scope levels (the
//! rule's `name`, then its `contentName`, either possibly unnamed) and every
//! pop closes them again.

use rustc_hash::FxHashMap;
use tm_ir::{CaptureKind, FrameStack, LineText, MatchData, PatternKind, Patterns, Priority, Rule, Token};

use crate::backref::{self, BackReference};
use crate::captures::{order_captures, CaptureEvent};
use crate::error::LexError;
use crate::matcher::RuleMatcher;
use crate::session::LexState;

pub(crate) struct LineScanner {
    state: LexState,
    /// Document offset up to which tokens have been emitted.
    offset: usize,
    loop_bound: usize,
    /// Frame stack at the last emission, with how often the scan has come
    /// back to it since without emitting anything.
    last_emission: Option<FrameStack>,
    returns_to_last_emission: usize,
}

impl LineScanner {
    pub(crate) fn new(state: LexState, offset: usize, loop_bound: usize) -> Self {
        LineScanner {
            state,
            offset,
            loop_bound,
            last_emission: None,
            returns_to_last_emission: 0,
        }
    }

    pub(crate) fn state(&self) -> &LexState {
        &self.state
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    /// Scan one line.
    ///
    /// `text` is the visible line (its `\n`, if any, included) and
    /// `line_start` its document offset. Tokens are emitted up to the end of
    /// `text`; the caller flushes anything past it.
    ///
    /// # Errors
    /// Invalid patterns and cancellation. Tokens emitted before the failure
    /// stay in `out`.
    #[tracing::instrument(level = "trace", skip_all, fields(line_start = line_start, len = text.len()))]
    pub(crate) fn parse_line(
        &mut self,
        matcher: &RuleMatcher<'_>,
        text: &str,
        line_start: usize,
        out: &mut Vec<Token>,
    ) -> Result<(), LexError> {
        let visible = text.len();
        let line = if text.ends_with('\n') {
            LineText::new(text)
        } else {
            LineText::new(format!("{text}\n"))
        };
        // Line-relative match offset to document offset, never past the
        // visible text.
        let at = move |position: usize| line_start + position.min(visible);
        let grammar = matcher.grammar();

        self.last_emission = None;
        self.returns_to_last_emission = 0;

        // Regions whose while-condition no longer holds end at the line start.
        while grammar
            .rule(self.state.frames.top().rule)
            .pattern(PatternKind::While)
            .is_some()
        {
            let Some(below) = self.state.frames.pop() else {
                break;
            };
            let top = self.state.frames.top().clone();
            if matcher
                .match_string_pattern(PatternKind::While, &line, 0, &top)?
                .is_matched()
            {
                break;
            }
            tracing::debug!(rule = ?top.rule, line_start, "while condition failed, closing region");
            self.close_scope(out, at(0));
            self.close_scope(out, at(0));
            self.state.frames = below;
        }

        let mut position = 0;
        let mut depth_at_position = self.state.frames.len();
        let mut seen_at_position: FxHashMap<FrameStack, usize> = FxHashMap::default();
        loop {
            let top = self.state.frames.top().clone();
            let current =
                matcher.match_first(top.rule, &line, position, Priority::Normal, &self.state.scope)?;
            let end = matcher.match_string_pattern(PatternKind::End, &line, position, &top)?;

            let end_wins = match (end.range(), current.range()) {
                (Some(_), None) => true,
                (Some(end), Some(candidate)) => candidate.start >= end.start || current == top,
                (None, _) => false,
            };
            let below = if end_wins { self.state.frames.pop() } else { None };

            let next_position = if let (Some(below), Some(range)) = (below, end.range()) {
                self.state.frames = below;
                let rule = grammar.rule(top.rule);
                self.close_scope(out, at(range.start));
                let declares_none = [CaptureKind::Begin, CaptureKind::End, CaptureKind::Generic]
                    .into_iter()
                    .all(|kind| rule.captures(kind).is_none());
                let end_captured = self.emit_captures(out, rule, CaptureKind::End, &end, &line, at);
                let generic_captured =
                    self.emit_captures(out, rule, CaptureKind::Generic, &end, &line, at);
                // Without end or generic captures, a rule that captures its
                // begin leaves the end text to the enclosing region.
                let resolved = if declares_none || end_captured || generic_captured {
                    range.end
                } else {
                    range.start
                };
                self.close_scope(out, at(resolved));
                resolved
            } else if let Some(range) = current.range() {
                let rule = grammar.rule(current.rule);
                match &rule.patterns {
                    Patterns::Begin { .. } => {
                        let name = resolve_name(rule.name.as_deref(), &line, &current.match_data);
                        self.open_scope(out, name.as_deref(), at(range.start));
                        self.emit_captures(out, rule, CaptureKind::Begin, &current.match_data, &line, at);
                        self.emit_captures(out, rule, CaptureKind::Generic, &current.match_data, &line, at);
                        let content =
                            resolve_name(rule.content_name.as_deref(), &line, &current.match_data);
                        self.open_scope(out, content.as_deref(), at(range.end));
                        self.state.frames = self.state.frames.push(current);
                    }
                    Patterns::Match(_) => {
                        let name = resolve_name(rule.name.as_deref(), &line, &current.match_data);
                        self.open_scope(out, name.as_deref(), at(range.start));
                        self.emit_captures(out, rule, CaptureKind::Generic, &current.match_data, &line, at);
                        self.close_scope(out, at(range.end));
                    }
                    Patterns::End(_) | Patterns::None => {}
                }
                range.end
            } else {
                self.add_token(out, at(visible));
                break;
            };

            if self.is_looping(&mut seen_at_position, depth_at_position) {
                tracing::debug!(line_start, position, "loop guard tripped, flushing line");
                self.add_token(out, at(visible));
                break;
            }

            if next_position != position {
                seen_at_position.clear();
                position = next_position;
                depth_at_position = self.state.frames.len();
            }
            matcher.cancel().check()?;
        }
        Ok(())
    }

    /// Loop guards, checked after every transition.
    ///
    /// Trips when the scan returns to the frame stack of the last emission
    /// more than `loop_bound` times, when one frame stack recurs more than
    /// `loop_bound` times at the same position, or when zero-width begins
    /// keep pushing frames without the position moving.
    fn is_looping(
        &mut self,
        seen_at_position: &mut FxHashMap<FrameStack, usize>,
        depth_at_position: usize,
    ) -> bool {
        if self.last_emission.as_ref() == Some(&self.state.frames) {
            self.returns_to_last_emission += 1;
            if self.returns_to_last_emission > self.loop_bound {
                return true;
            }
        }

        let seen = seen_at_position
            .entry(self.state.frames.clone())
            .or_insert(0);
        if *seen > self.loop_bound {
            return true;
        }
        *seen += 1;

        self.state.frames.len() > depth_at_position + self.loop_bound
    }

    /// Open and close the scopes of the `kind` captures of `match_data`.
    ///
    /// Returns whether the rule declares any `kind` captures.
    fn emit_captures(
        &mut self,
        out: &mut Vec<Token>,
        rule: &Rule,
        kind: CaptureKind,
        match_data: &MatchData,
        line: &LineText,
        at: impl Fn(usize) -> usize,
    ) -> bool {
        let Some(captures) = rule.captures(kind) else {
            return false;
        };
        for event in order_captures(captures, match_data) {
            match event {
                CaptureEvent::Open { offset, name, .. } => {
                    let name = backref::resolve(name, Some(line), match_data, BackReference::Scope);
                    self.open_scope(out, Some(name.as_ref()), at(offset));
                }
                CaptureEvent::Close { offset, .. } => self.close_scope(out, at(offset)),
            }
        }
        !captures.is_empty()
    }

    /// Emit the pending token up to `position`, then enter `name`.
    fn open_scope(&mut self, out: &mut Vec<Token>, name: Option<&str>, position: usize) {
        self.add_token(out, position);
        self.state.scope = self.state.scope.push(name);
    }

    /// Emit the pending token up to `position` if the innermost scope is
    /// named, then leave it. The root scope is never left.
    fn close_scope(&mut self, out: &mut Vec<Token>, position: usize) {
        if self.state.scope.name().is_some() {
            self.add_token(out, position);
        }
        self.state.scope = self.state.scope.pop();
    }

    /// Emit a token from the current offset to `position` in the current
    /// scope. Nothing happens unless `position` is past the offset.
    pub(crate) fn add_token(&mut self, out: &mut Vec<Token>, position: usize) {
        if position <= self.offset {
            return;
        }
        out.push(Token {
            scope: self.state.scope.clone(),
            start: self.offset,
            end: position,
            restartable: self.state.scope.is_root(),
        });
        self.offset = position;
        self.last_emission = Some(self.state.frames.clone());
        self.returns_to_last_emission = 0;
    }
}

fn resolve_name<'t>(
    template: Option<&'t str>,
    line: &LineText,
    match_data: &MatchData,
) -> Option<std::borrow::Cow<'t, str>> {
    template.map(|template| backref::resolve(template, Some(line), match_data, BackReference::Scope))
}
