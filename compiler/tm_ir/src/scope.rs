//! Persistent scope paths.
//!
//! A [`ScopePath`] is the nested sequence of scope names active at a
//! position, stored leaf-first as an immutable cons-list. Opening a scope
//! prepends one node; closing reverts to the parent. Paths built from the
//! same segments compare and hash equal regardless of which allocation they
//! live in, which is what lets them participate in match-cache keys.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

struct ScopeNode {
    /// Segment name. `None` marks an unnamed level (e.g. a begin rule without
    /// `contentName`), which still has to be closed like any other.
    name: Option<Arc<str>>,
    parent: Option<ScopePath>,
    /// Number of segments including this one.
    depth: u32,
    /// Structural hash of the whole path, computed once at construction.
    hash: u64,
}

/// Immutable, shareable scope path.
#[derive(Clone)]
pub struct ScopePath(Arc<ScopeNode>);

impl ScopePath {
    /// Create a root path holding the grammar's scope name.
    pub fn root(name: impl Into<Arc<str>>) -> Self {
        Self::node(Some(name.into()), None)
    }

    fn node(name: Option<Arc<str>>, parent: Option<ScopePath>) -> Self {
        let mut hasher = FxHasher::default();
        let depth = match &parent {
            Some(parent) => {
                hasher.write_u64(parent.0.hash);
                parent.0.depth + 1
            }
            None => 1,
        };
        name.as_deref().hash(&mut hasher);
        ScopePath(Arc::new(ScopeNode {
            name,
            parent,
            depth,
            hash: hasher.finish(),
        }))
    }

    /// Open a nested scope. Empty names are stored as unnamed levels.
    #[must_use]
    pub fn push(&self, name: Option<&str>) -> Self {
        let name = name.filter(|n| !n.is_empty()).map(Arc::from);
        Self::node(name, Some(self.clone()))
    }

    /// Close the innermost scope. The root is never removed.
    #[must_use]
    pub fn pop(&self) -> Self {
        self.parent().cloned().unwrap_or_else(|| self.clone())
    }

    /// Name of the innermost segment, if it is named.
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn parent(&self) -> Option<&ScopePath> {
        self.0.parent.as_ref()
    }

    /// `true` when this path has no parent, i.e. scanning is back at the
    /// grammar root.
    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Number of segments, named or not.
    pub fn depth(&self) -> usize {
        self.0.depth as usize
    }

    /// Named segments ordered root to leaf.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.iter().filter_map(ScopePath::name).collect();
        names.reverse();
        names
    }

    /// Iterate from this node towards the root.
    pub fn iter(&self) -> impl Iterator<Item = &ScopePath> {
        std::iter::successors(Some(self), |path| path.parent())
    }
}

impl PartialEq for ScopePath {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            if Arc::ptr_eq(&a.0, &b.0) {
                return true;
            }
            if a.0.hash != b.0.hash || a.0.depth != b.0.depth || a.0.name != b.0.name {
                return false;
            }
            match (a.parent(), b.parent()) {
                (Some(pa), Some(pb)) => {
                    a = pa;
                    b = pb;
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl Eq for ScopePath {}

impl Hash for ScopePath {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(" "))
    }
}

impl fmt::Debug for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopePath({:?})", self.names())
    }
}
