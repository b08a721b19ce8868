//! Pattern compilation and byte-offset search.
//!
//! # Pattern Dialect
//!
//! The default engine compiles grammar patterns with `regex::bytes` in
//! multi-line mode, so `^` and `$` bind to the line's own boundaries (every
//! line handed to the engine ends with `\n`). Constructs `regex` does not
//! support, such as look-around or `\G`, surface as
//! [`MatchError::InvalidPattern`] on first use. Back-references to an
//! enclosing begin match are not needed here: the lexer substitutes the
//! captured text into end/while patterns before searching.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use regex::bytes::{Regex, RegexBuilder};
use rustc_hash::{FxHashMap, FxHasher};
use tm_ir::{ByteRange, LineText, MatchData};

use crate::{CancellationToken, MatchError};

/// Compile-and-search capability consumed by the lexer.
pub trait RegexEngine: Send + Sync {
    /// Search `line` for `pattern`, starting at byte `start`.
    ///
    /// Returns the leftmost match at or after `start`, with one optional
    /// range per group. `start` past the end of the line is not an error;
    /// it simply never matches.
    ///
    /// # Errors
    /// [`MatchError::InvalidPattern`] if the pattern does not compile and
    /// [`MatchError::Cancelled`] if `cancel` fired.
    fn search(
        &self,
        pattern: &str,
        line: &LineText,
        start: usize,
        cancel: &CancellationToken,
    ) -> Result<MatchData, MatchError>;
}

/// Escape `literal` so it matches itself in the default engine's dialect.
///
/// Used when text captured by one match is spliced into a later pattern.
pub fn escape(literal: &str) -> String {
    regex::escape(literal)
}

const NUM_SHARDS: usize = 16;

/// Default [`RegexEngine`]: `regex::bytes` plus a compile cache keyed by
/// pattern text.
///
/// End and while patterns are compiled after back-reference substitution,
/// so every distinct captured delimiter is a new pattern. The cache is
/// bounded: a shard that reaches its share of the capacity is cleared
/// before the next insert.
///
/// # Thread Safety
/// Uses one `RwLock` per shard. Lookups of already-compiled patterns only
/// take a read lock; compilation happens outside any lock and is inserted
/// with a double-check, so two threads racing on the same pattern at worst
/// compile it twice.
pub struct RegexCache {
    shards: [RwLock<FxHashMap<Box<str>, Arc<Regex>>>; NUM_SHARDS],
    /// Total compiled patterns across shards (O(1) `len()`).
    total_count: AtomicUsize,
    /// Maximum patterns held per shard.
    shard_capacity: usize,
}

impl RegexCache {
    /// Default number of compiled patterns kept across all shards.
    pub const DEFAULT_CAPACITY: usize = 4 * 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// A cache holding at most `capacity` compiled patterns, rounded up to
    /// a multiple of the shard count. `0` keeps nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        RegexCache {
            shards: std::array::from_fn(|_| RwLock::new(FxHashMap::default())),
            total_count: AtomicUsize::new(0),
            shard_capacity: capacity.div_ceil(NUM_SHARDS),
        }
    }

    /// Process-wide engine shared by every lexer that does not bring its own.
    pub fn shared() -> Arc<RegexCache> {
        static SHARED: OnceLock<Arc<RegexCache>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(RegexCache::new())))
    }

    #[inline]
    fn shard_for(pattern: &str) -> usize {
        let mut hasher = FxHasher::default();
        pattern.hash(&mut hasher);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "only the low bits select a shard"
        )]
        let bits = hasher.finish() as usize;
        bits % NUM_SHARDS
    }

    /// Compile `pattern`, or return the cached compilation.
    ///
    /// # Errors
    /// Returns [`MatchError::InvalidPattern`] if the pattern does not compile.
    /// Failures are not cached.
    pub fn compile(&self, pattern: &str) -> Result<Arc<Regex>, MatchError> {
        let shard = &self.shards[Self::shard_for(pattern)];

        // Fast path: already compiled
        if let Some(regex) = shard.read().get(pattern) {
            return Ok(Arc::clone(regex));
        }

        let compiled = RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .map_err(|err| MatchError::InvalidPattern {
                pattern: pattern.into(),
                message: err.to_string(),
            })?;
        tracing::trace!(pattern, "compiled grammar pattern");

        let compiled = Arc::new(compiled);
        if self.shard_capacity == 0 {
            return Ok(compiled);
        }

        let mut guard = shard.write();
        // Double-check after acquiring write lock
        if let Some(regex) = guard.get(pattern) {
            return Ok(Arc::clone(regex));
        }
        if guard.len() >= self.shard_capacity {
            tracing::debug!(dropped = guard.len(), "regex cache shard full, clearing");
            self.total_count.fetch_sub(guard.len(), Ordering::Relaxed);
            guard.clear();
        }
        guard.insert(pattern.into(), Arc::clone(&compiled));
        self.total_count.fetch_add(1, Ordering::Relaxed);
        Ok(compiled)
    }

    /// Upper bound on [`len`](Self::len).
    pub fn capacity(&self) -> usize {
        self.shard_capacity * NUM_SHARDS
    }

    /// Number of compiled patterns held (O(1)).
    pub fn len(&self) -> usize {
        self.total_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl RegexEngine for RegexCache {
    fn search(
        &self,
        pattern: &str,
        line: &LineText,
        start: usize,
        cancel: &CancellationToken,
    ) -> Result<MatchData, MatchError> {
        cancel.check()?;
        let regex = self.compile(pattern)?;
        let haystack = line.as_bytes();
        if start > haystack.len() {
            return Ok(MatchData::not_matched());
        }

        let mut locations = regex.capture_locations();
        if regex.captures_read_at(&mut locations, haystack, start).is_none() {
            return Ok(MatchData::not_matched());
        }
        Ok(MatchData::matched((0..locations.len()).map(|group| {
            locations
                .get(group)
                .map(|(start, end)| ByteRange::new(start, end))
        })))
    }
}
