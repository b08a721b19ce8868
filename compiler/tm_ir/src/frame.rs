//! Parse frames and the persistent frame stack.
//!
//! A [`Frame`] records one open begin/end region: the rule that opened it,
//! the match that opened it, the priority tier it was selected with and the
//! line that match was taken from. The same shape is what the rule matcher
//! returns for a candidate, so a winning candidate is pushed as-is.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::{ByteRange, LineText, MatchData, RuleId};

/// Priority tier used to break ties between candidates starting at the same
/// offset. Ordered `Low < Normal < High`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// One active (or candidate) rule match.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frame {
    pub rule: RuleId,
    pub match_data: MatchData,
    pub priority: Priority,
    /// Line the match was taken from. `None` only for frames that never
    /// matched, such as the root frame.
    pub line: Option<LineText>,
}

impl Frame {
    /// A frame for `rule` that matched nothing.
    pub fn not_matched(rule: RuleId) -> Self {
        Frame {
            rule,
            match_data: MatchData::not_matched(),
            priority: Priority::Low,
            line: None,
        }
    }

    #[inline]
    pub fn is_matched(&self) -> bool {
        self.match_data.is_matched()
    }

    /// Range of the whole match, if any.
    #[inline]
    pub fn range(&self) -> Option<ByteRange> {
        self.match_data.range()
    }
}

struct FrameNode {
    frame: Frame,
    below: Option<FrameStack>,
    len: u32,
    hash: u64,
}

/// Persistent, never-empty stack of frames. Top = most recently opened.
///
/// Cloning is a pointer copy, so the scanner can keep snapshots of every
/// state it has visited on a line for loop detection.
#[derive(Clone)]
pub struct FrameStack(Arc<FrameNode>);

impl FrameStack {
    /// A stack holding only `bottom`.
    pub fn new(bottom: Frame) -> Self {
        Self::node(bottom, None)
    }

    fn node(frame: Frame, below: Option<FrameStack>) -> Self {
        let mut hasher = FxHasher::default();
        let len = match &below {
            Some(below) => {
                hasher.write_u64(below.0.hash);
                below.0.len + 1
            }
            None => 1,
        };
        frame.hash(&mut hasher);
        FrameStack(Arc::new(FrameNode {
            frame,
            below,
            len,
            hash: hasher.finish(),
        }))
    }

    #[must_use]
    pub fn push(&self, frame: Frame) -> Self {
        Self::node(frame, Some(self.clone()))
    }

    /// The stack without its top frame, or `None` if only one frame is left.
    pub fn pop(&self) -> Option<FrameStack> {
        self.0.below.clone()
    }

    #[inline]
    pub fn top(&self) -> &Frame {
        &self.0.frame
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len as usize
    }

    /// Always `false`; present for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Frames from top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(Some(self), |stack| stack.0.below.as_ref()).map(|s| &s.0.frame)
    }
}

impl PartialEq for FrameStack {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            if Arc::ptr_eq(&a.0, &b.0) {
                return true;
            }
            if a.0.hash != b.0.hash || a.0.len != b.0.len || a.0.frame != b.0.frame {
                return false;
            }
            match (&a.0.below, &b.0.below) {
                (Some(x), Some(y)) => {
                    a = x;
                    b = y;
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl Eq for FrameStack {}

impl Hash for FrameStack {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl std::fmt::Debug for FrameStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
