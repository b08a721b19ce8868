//! Line buffers and regex match results.
//!
//! All positions are byte offsets into the UTF-8 encoding of a line. The
//! regex capability reports them, the scanner slices with them, and
//! back-reference substitution copies the exact bytes they cover.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

/// Source of process-unique line ids.
static NEXT_LINE_ID: AtomicU64 = AtomicU64::new(1);

/// One line of text as fed to the regex capability.
///
/// Equality and hashing use the line's id, not its contents: every
/// `LineText` is a distinct identity even when two lines read the same,
/// which keeps match-cache keys cheap and makes frames remember exactly
/// which buffer their captures point into.
#[derive(Clone)]
pub struct LineText {
    id: u64,
    text: Arc<str>,
}

impl LineText {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        LineText {
            id: NEXT_LINE_ID.fetch_add(1, Ordering::Relaxed),
            text: text.into(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Bytes covered by `range`, or `None` if it falls outside the line.
    pub fn slice(&self, range: ByteRange) -> Option<&[u8]> {
        self.as_bytes().get(range.start..range.end)
    }
}

impl PartialEq for LineText {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LineText {}

impl Hash for LineText {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for LineText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineText#{}({:?})", self.id, self.text)
    }
}

/// Half-open byte range `[start, end)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        ByteRange { start, end }
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.start >= self.end
    }
}

/// Result of one regex search.
///
/// Empty group list means "not matched". Otherwise group 0 is the whole
/// match and group `n` is `None` when it did not participate.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct MatchData {
    groups: SmallVec<[Option<ByteRange>; 4]>,
}

impl MatchData {
    /// The not-matched result.
    pub fn not_matched() -> Self {
        MatchData::default()
    }

    /// Build a matched result from per-group ranges.
    ///
    /// # Panics
    /// Panics if `groups` is empty or group 0 is `None`; a successful
    /// match always covers some (possibly empty) range.
    pub fn matched(groups: impl IntoIterator<Item = Option<ByteRange>>) -> Self {
        let groups: SmallVec<[Option<ByteRange>; 4]> = groups.into_iter().collect();
        assert!(
            groups.first().is_some_and(Option::is_some),
            "a successful match must report group 0"
        );
        MatchData { groups }
    }

    #[inline]
    pub fn is_matched(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Range of the whole match.
    #[inline]
    pub fn range(&self) -> Option<ByteRange> {
        self.group(0)
    }

    /// Range of group `index`, if the group exists and participated.
    #[inline]
    pub fn group(&self, index: usize) -> Option<ByteRange> {
        self.groups.get(index).copied().flatten()
    }

    /// Number of groups including group 0 (zero when not matched).
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Start of the whole match.
    #[inline]
    pub fn start(&self) -> Option<usize> {
        self.range().map(|r| r.start)
    }
}

impl fmt::Debug for MatchData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_matched() {
            f.debug_list()
                .entries(
                    self.groups
                        .iter()
                        .map(|g| g.map(|r| (r.start, r.end))),
                )
                .finish()
        } else {
            f.write_str("NotMatched")
        }
    }
}
