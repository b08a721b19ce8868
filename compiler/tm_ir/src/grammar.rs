//! Immutable grammar rule arena.
//!
//! Rules live in a flat `Vec` and refer to each other by [`RuleId`], so a
//! grammar that includes itself (directly or through repository entries) is
//! just a cycle of indices. A built [`Grammar`] is immutable and safe to
//! share across threads and sessions.
//!
//! # Construction
//!
//! ```text
//! let mut b = GrammarBuilder::new("source.demo");
//! let kw = b.rule(Rule::matching(r"\b(if|else)\b").with_name("keyword.control"));
//! let string = b.rule(Rule::begin_end("\"", "\"").with_name("string.quoted"));
//! b.children(b.root(), [kw, string]);
//! let grammar = b.build()?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

/// Index of a rule inside its grammar's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleId(u32);

impl RuleId {
    /// The grammar's entry rule is always the first rule in the arena.
    pub const ROOT: RuleId = RuleId(0);

    /// # Panics
    /// Panics if `index` does not fit in `u32`.
    #[inline]
    pub fn new(index: usize) -> Self {
        RuleId(u32::try_from(index).unwrap_or_else(|_| panic!("rule index {index} overflows u32")))
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Process-unique identity of a built grammar.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GrammarId(u64);

static NEXT_GRAMMAR_ID: AtomicU64 = AtomicU64::new(1);

impl GrammarId {
    fn fresh() -> Self {
        GrammarId(NEXT_GRAMMAR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which of a rule's own patterns to look up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Match,
    Begin,
    End,
    While,
}

/// The patterns a rule carries.
///
/// A begin rule may carry `end`, `while`, or both; a rule with no own
/// pattern is a grouping node whose children are matched in its place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Patterns {
    #[default]
    None,
    Match(Arc<str>),
    Begin {
        begin: Arc<str>,
        end: Option<Arc<str>>,
        while_pattern: Option<Arc<str>>,
    },
    /// Only an end pattern. Never matches as a child; end patterns are only
    /// evaluated against the frame that opened them.
    End(Arc<str>),
}

/// Which capture map of a rule to use.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    Begin,
    End,
    Generic,
}

impl CaptureKind {
    const fn slot(self) -> usize {
        match self {
            CaptureKind::Begin => 0,
            CaptureKind::End => 1,
            CaptureKind::Generic => 2,
        }
    }
}

/// Group number to scope-name template, ordered by group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureMap {
    entries: SmallVec<[(usize, Arc<str>); 4]>,
}

impl CaptureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scope name for `group`, replacing any previous one.
    pub fn insert(&mut self, group: usize, name: impl Into<Arc<str>>) {
        let name = name.into();
        match self.entries.binary_search_by_key(&group, |(g, _)| *g) {
            Ok(pos) => self.entries[pos].1 = name,
            Err(pos) => self.entries.insert(pos, (group, name)),
        }
    }

    pub fn get(&self, group: usize) -> Option<&str> {
        self.entries
            .binary_search_by_key(&group, |(g, _)| *g)
            .ok()
            .map(|pos| &*self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(group, name)| (*group, &**name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<Arc<str>>> FromIterator<(usize, N)> for CaptureMap {
    fn from_iter<I: IntoIterator<Item = (usize, N)>>(iter: I) -> Self {
        let mut map = CaptureMap::new();
        for (group, name) in iter {
            map.insert(group, name);
        }
        map
    }
}

/// A grammar fragment that may interrupt the host when `selector` weighs
/// positively against the current scope path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Injection {
    pub selector: Arc<str>,
    pub rule: RuleId,
}

/// One grammar rule node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rule {
    /// Scope name template; may reference begin/match captures as `$N`.
    pub name: Option<Arc<str>>,
    /// Scope applied between a begin match and its end match.
    pub content_name: Option<Arc<str>>,
    pub patterns: Patterns,
    pub children: Vec<RuleId>,
    pub injections: Vec<Injection>,
    captures: [Option<CaptureMap>; 3],
}

impl Rule {
    /// A grouping rule with no own pattern.
    pub fn group() -> Self {
        Rule::default()
    }

    /// A one-shot leaf rule.
    pub fn matching(pattern: impl Into<Arc<str>>) -> Self {
        Rule {
            patterns: Patterns::Match(pattern.into()),
            ..Rule::default()
        }
    }

    /// A region delimited by `begin` and `end`.
    pub fn begin_end(begin: impl Into<Arc<str>>, end: impl Into<Arc<str>>) -> Self {
        Rule {
            patterns: Patterns::Begin {
                begin: begin.into(),
                end: Some(end.into()),
                while_pattern: None,
            },
            ..Rule::default()
        }
    }

    /// A region opened by `begin` that lasts while every following line
    /// matches `while_pattern` at its start.
    pub fn begin_while(begin: impl Into<Arc<str>>, while_pattern: impl Into<Arc<str>>) -> Self {
        Rule {
            patterns: Patterns::Begin {
                begin: begin.into(),
                end: None,
                while_pattern: Some(while_pattern.into()),
            },
            ..Rule::default()
        }
    }

    /// A rule that only declares an end pattern.
    pub fn end_only(end: impl Into<Arc<str>>) -> Self {
        Rule {
            patterns: Patterns::End(end.into()),
            ..Rule::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_content_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.content_name = Some(name.into());
        self
    }

    /// Add an end pattern to a begin rule. Other rules are left unchanged.
    #[must_use]
    pub fn with_end(mut self, pattern: impl Into<Arc<str>>) -> Self {
        if let Patterns::Begin { end, .. } = &mut self.patterns {
            *end = Some(pattern.into());
        }
        self
    }

    /// Add a while pattern to a begin rule. Other rules are left unchanged.
    #[must_use]
    pub fn with_while(mut self, pattern: impl Into<Arc<str>>) -> Self {
        if let Patterns::Begin { while_pattern, .. } = &mut self.patterns {
            *while_pattern = Some(pattern.into());
        }
        self
    }

    #[must_use]
    pub fn with_capture(mut self, kind: CaptureKind, group: usize, name: impl Into<Arc<str>>) -> Self {
        self.captures[kind.slot()]
            .get_or_insert_with(CaptureMap::new)
            .insert(group, name);
        self
    }

    #[must_use]
    pub fn with_captures(mut self, kind: CaptureKind, captures: CaptureMap) -> Self {
        self.captures[kind.slot()] = Some(captures);
        self
    }

    /// The rule's own pattern of the given kind.
    pub fn pattern(&self, kind: PatternKind) -> Option<&str> {
        match (&self.patterns, kind) {
            (Patterns::Match(p), PatternKind::Match)
            | (Patterns::Begin { begin: p, .. }, PatternKind::Begin)
            | (Patterns::End(p), PatternKind::End) => Some(&**p),
            (Patterns::Begin { end, .. }, PatternKind::End) => end.as_deref(),
            (Patterns::Begin { while_pattern, .. }, PatternKind::While) => while_pattern.as_deref(),
            _ => None,
        }
    }

    #[inline]
    pub fn has_begin(&self) -> bool {
        matches!(self.patterns, Patterns::Begin { .. })
    }

    pub fn captures(&self, kind: CaptureKind) -> Option<&CaptureMap> {
        self.captures[kind.slot()].as_ref()
    }
}

/// Error raised while building a grammar.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("rule {from:?} references unknown rule {target:?}")]
    UnknownRule { from: RuleId, target: RuleId },
}

/// A built, immutable grammar.
#[derive(Debug)]
pub struct Grammar {
    id: GrammarId,
    scope_name: Arc<str>,
    rules: Vec<Rule>,
}

impl Grammar {
    #[inline]
    pub fn id(&self) -> GrammarId {
        self.id
    }

    /// Scope name of the root scope, e.g. `source.rust`.
    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    #[inline]
    pub fn root(&self) -> RuleId {
        RuleId::ROOT
    }

    /// Rule lookup. Ids handed out by the builder are always valid.
    #[inline]
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Incremental builder for a [`Grammar`].
#[derive(Debug)]
pub struct GrammarBuilder {
    scope_name: Arc<str>,
    rules: Vec<Rule>,
}

impl GrammarBuilder {
    /// Start a grammar whose root is an empty grouping rule.
    pub fn new(scope_name: impl Into<Arc<str>>) -> Self {
        GrammarBuilder {
            scope_name: scope_name.into(),
            rules: vec![Rule::group()],
        }
    }

    #[inline]
    pub fn root(&self) -> RuleId {
        RuleId::ROOT
    }

    /// Add a rule to the arena.
    pub fn rule(&mut self, rule: Rule) -> RuleId {
        let id = RuleId::new(self.rules.len());
        self.rules.push(rule);
        id
    }

    /// Mutable access to a rule added earlier, e.g. to close a cycle.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this builder.
    pub fn rule_mut(&mut self, id: RuleId) -> &mut Rule {
        &mut self.rules[id.index()]
    }

    /// Append `children` to `parent`'s ordered child list.
    pub fn children(&mut self, parent: RuleId, children: impl IntoIterator<Item = RuleId>) -> &mut Self {
        self.rule_mut(parent).children.extend(children);
        self
    }

    /// Declare `rule` as injected into `target` under `selector`.
    pub fn inject(&mut self, target: RuleId, selector: impl Into<Arc<str>>, rule: RuleId) -> &mut Self {
        self.rule_mut(target).injections.push(Injection {
            selector: selector.into(),
            rule,
        });
        self
    }

    /// Freeze the arena.
    ///
    /// # Errors
    /// Returns [`GrammarError::UnknownRule`] if any child or injection
    /// refers outside the arena.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let len = self.rules.len();
        for (index, rule) in self.rules.iter().enumerate() {
            let targets = rule
                .children
                .iter()
                .copied()
                .chain(rule.injections.iter().map(|inj| inj.rule));
            for target in targets {
                if target.index() >= len {
                    return Err(GrammarError::UnknownRule {
                        from: RuleId::new(index),
                        target,
                    });
                }
            }
        }
        Ok(Grammar {
            id: GrammarId::fresh(),
            scope_name: self.scope_name,
            rules: self.rules,
        })
    }
}
