//! Process-wide memo of rule matching results.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use tm_ir::{Frame, GrammarId, Priority, RuleId, ScopePath};

/// Everything a [`RuleMatcher::match_first`](crate::RuleMatcher::match_first)
/// result depends on.
///
/// Lines are identified by [`LineText::id`](tm_ir::LineText::id), so two
/// sessions lexing equal text never share entries; within one session the
/// end/while searches of a line reuse the child searches of that same line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub grammar: GrammarId,
    pub rule: RuleId,
    pub line: u64,
    pub offset: usize,
    pub priority: Priority,
    pub scope: ScopePath,
}

/// Concurrent, bounded map from [`MatchKey`] to the winning frame.
///
/// Entries are pure functions of their key, so the cache may forget them at
/// any time. When it reaches `capacity` entries it starts over.
pub struct MatchCache {
    entries: DashMap<MatchKey, Frame, FxBuildHasher>,
    capacity: usize,
}

impl MatchCache {
    /// Default number of entries kept before the cache resets.
    pub const DEFAULT_CAPACITY: usize = 64 * 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// A cache holding at most `capacity` entries. `0` stores nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        MatchCache {
            entries: DashMap::with_hasher(FxBuildHasher),
            capacity,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::with_capacity(0)
    }

    /// The process-wide cache used by sessions that do not bring their own.
    pub fn shared() -> Arc<MatchCache> {
        static SHARED: OnceLock<Arc<MatchCache>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(MatchCache::new())))
    }

    pub fn get(&self, key: &MatchKey) -> Option<Frame> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: MatchKey, frame: Frame) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "match cache full, clearing");
            self.entries.clear();
        }
        self.entries.insert(key, frame);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MatchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
