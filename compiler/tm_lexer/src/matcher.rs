//! Candidate selection.
//!
//! At every position the scanner asks which of the top rule's children (or
//! injected rules) applies. The answer is the leftmost candidate under the
//! dominance order of [`more_important`]; candidates that match at the search
//! offset itself short-circuit the search.

use smallvec::SmallVec;
use tm_ir::{Frame, Grammar, LineText, MatchData, PatternKind, Patterns, Priority, RuleId, ScopePath};
use tm_regex::{CancellationToken, MatchError, RegexEngine};
use tm_selector::SelectorWeigher;

use crate::backref::{self, BackReference};
use crate::cache::{MatchCache, MatchKey};
use crate::stack::ensure_sufficient_stack;

/// Grouping rules currently being expanded on the recursion path.
type Expanding = SmallVec<[RuleId; 8]>;

/// Resolves rule transitions for one grammar.
///
/// Borrowed views only: a matcher is built per line by the session and holds
/// no state of its own beyond what the shared [`MatchCache`] remembers.
#[derive(Copy, Clone)]
pub struct RuleMatcher<'a> {
    grammar: &'a Grammar,
    regex: &'a dyn RegexEngine,
    weigher: &'a dyn SelectorWeigher,
    cache: &'a MatchCache,
    cancel: &'a CancellationToken,
}

impl<'a> RuleMatcher<'a> {
    pub fn new(
        grammar: &'a Grammar,
        regex: &'a dyn RegexEngine,
        weigher: &'a dyn SelectorWeigher,
        cache: &'a MatchCache,
        cancel: &'a CancellationToken,
    ) -> Self {
        RuleMatcher {
            grammar,
            regex,
            weigher,
            cache,
            cancel,
        }
    }

    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    pub fn cancel(&self) -> &'a CancellationToken {
        self.cancel
    }

    /// Best candidate among `rule`'s children and applicable injections at
    /// or after `offset`.
    ///
    /// Returns a not-matched frame for `rule` when nothing applies.
    /// Memoized in the shared cache; a hit returns exactly what the search
    /// would have computed.
    ///
    /// # Errors
    /// Propagates invalid patterns and cancellation from the regex engine.
    pub fn match_first(
        &self,
        rule: RuleId,
        line: &LineText,
        offset: usize,
        priority: Priority,
        scope: &ScopePath,
    ) -> Result<Frame, MatchError> {
        let key = MatchKey {
            grammar: self.grammar.id(),
            rule,
            line: line.id(),
            offset,
            priority,
            scope: scope.clone(),
        };
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!(?rule, offset, "match cache hit");
            return Ok(hit);
        }

        let mut expanding = Expanding::new();
        let found = self.match_first_uncached(rule, line, offset, priority, scope, &mut expanding)?;
        self.cache.insert(key, found.clone());
        Ok(found)
    }

    fn match_first_uncached(
        &self,
        rule: RuleId,
        line: &LineText,
        offset: usize,
        priority: Priority,
        scope: &ScopePath,
        expanding: &mut Expanding,
    ) -> Result<Frame, MatchError> {
        // A group that (transitively) includes itself contributes nothing new.
        if expanding.contains(&rule) {
            return Ok(Frame::not_matched(rule));
        }
        expanding.push(rule);
        let found = ensure_sufficient_stack(|| {
            self.fold_candidates(rule, line, offset, priority, scope, expanding)
        });
        expanding.pop();
        found
    }

    fn fold_candidates(
        &self,
        rule: RuleId,
        line: &LineText,
        offset: usize,
        priority: Priority,
        scope: &ScopePath,
        expanding: &mut Expanding,
    ) -> Result<Frame, MatchError> {
        let node = self.grammar.rule(rule);

        let mut best = Frame::not_matched(rule);
        for &child in &node.children {
            let candidate = self.match_child(child, line, offset, priority, scope, expanding)?;
            best = more_important(self.grammar, best, candidate);
            if best.match_data.start() == Some(offset) {
                break;
            }
        }

        if node.injections.is_empty() {
            return Ok(best);
        }
        let mut injected = Frame::not_matched(rule);
        for injection in &node.injections {
            let weigh = self.weigher.weigh(&injection.selector, scope);
            if !weigh.applies() {
                continue;
            }
            let candidate =
                self.match_child(injection.rule, line, offset, weigh.priority, scope, expanding)?;
            injected = more_important(self.grammar, injected, candidate);
        }
        Ok(more_important(self.grammar, best, injected))
    }

    fn match_child(
        &self,
        child: RuleId,
        line: &LineText,
        offset: usize,
        priority: Priority,
        scope: &ScopePath,
        expanding: &mut Expanding,
    ) -> Result<Frame, MatchError> {
        match &self.grammar.rule(child).patterns {
            Patterns::Match(pattern) | Patterns::Begin { begin: pattern, .. } => {
                let match_data = self.regex.search(pattern, line, offset, self.cancel)?;
                if !match_data.is_matched() {
                    return Ok(Frame::not_matched(child));
                }
                Ok(Frame {
                    rule: child,
                    match_data,
                    priority,
                    line: Some(line.clone()),
                })
            }
            // Only meaningful as the closing half of an open region.
            Patterns::End(_) => Ok(Frame::not_matched(child)),
            Patterns::None => {
                self.match_first_uncached(child, line, offset, priority, scope, expanding)
            }
        }
    }

    /// Search `line` for the `end` or `while` pattern of `frame`'s rule.
    ///
    /// `\N` references in the pattern are replaced with the text group `N`
    /// captured when `frame` was opened. A rule without such a pattern never
    /// matches.
    ///
    /// # Errors
    /// Propagates invalid patterns and cancellation from the regex engine.
    pub fn match_string_pattern(
        &self,
        kind: PatternKind,
        line: &LineText,
        offset: usize,
        frame: &Frame,
    ) -> Result<MatchData, MatchError> {
        let Some(pattern) = self.grammar.rule(frame.rule).pattern(kind) else {
            return Ok(MatchData::not_matched());
        };
        let pattern = backref::resolve(
            pattern,
            frame.line.as_ref(),
            &frame.match_data,
            BackReference::Regex,
        );
        self.regex.search(&pattern, line, offset, self.cancel)
    }
}

/// Fold step of candidate selection: returns `candidate` if it dominates
/// `best`, otherwise `best`.
///
/// A matched candidate dominates an unmatched one. Between two matches the
/// candidate must start earlier, or at the same offset with a higher
/// priority tier; and it must not be an empty match displacing a non-empty
/// one, unless the candidate opens a region.
pub fn more_important(grammar: &Grammar, best: Frame, candidate: Frame) -> Frame {
    match (best.range(), candidate.range()) {
        (_, None) => best,
        (None, Some(_)) => candidate,
        (Some(old), Some(new)) => {
            let earlier = new.start < old.start
                || (new.start == old.start && candidate.priority > best.priority);
            let substantive =
                !new.is_empty() || old.is_empty() || grammar.rule(candidate.rule).has_begin();
            if earlier && substantive {
                candidate
            } else {
                best
            }
        }
    }
}

#[cfg(test)]
mod tests;
