//! Memoizing weigher.

use std::borrow::Borrow;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use tm_ir::ScopePath;

use crate::{SelectorWeigher, Weigh};

/// Default number of (selector, scope) weights kept before the cache resets.
pub const DEFAULT_CAPACITY: usize = 16 * 1024;

/// A (selector, scope path) key, owned or borrowed.
///
/// The map stores owned keys and is probed with borrowed ones, so a cache
/// hit allocates nothing. Both forms hash like the owned tuple.
trait WeighKey {
    fn selector(&self) -> &str;
    fn scope(&self) -> &ScopePath;
}

type OwnedKey = (Arc<str>, ScopePath);

impl WeighKey for OwnedKey {
    fn selector(&self) -> &str {
        &self.0
    }

    fn scope(&self) -> &ScopePath {
        &self.1
    }
}

impl WeighKey for (&str, &ScopePath) {
    fn selector(&self) -> &str {
        self.0
    }

    fn scope(&self) -> &ScopePath {
        self.1
    }
}

impl<'a> Borrow<dyn WeighKey + 'a> for OwnedKey {
    fn borrow(&self) -> &(dyn WeighKey + 'a) {
        self
    }
}

impl Hash for dyn WeighKey + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.selector().hash(state);
        self.scope().hash(state);
    }
}

impl PartialEq for dyn WeighKey + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.selector() == other.selector() && self.scope() == other.scope()
    }
}

impl Eq for dyn WeighKey + '_ {}

/// Wraps a weigher and remembers its answers.
///
/// Weighing is a pure function of (selector, scope path), so entries can be
/// dropped at any time; the cache simply starts over once it holds
/// `capacity` entries.
pub struct CachingWeigher<W> {
    inner: W,
    cache: DashMap<OwnedKey, Weigh, FxBuildHasher>,
    capacity: usize,
}

impl<W: SelectorWeigher> CachingWeigher<W> {
    pub fn new(inner: W) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: W, capacity: usize) -> Self {
        CachingWeigher {
            inner,
            cache: DashMap::with_hasher(FxBuildHasher),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<W: SelectorWeigher> SelectorWeigher for CachingWeigher<W> {
    fn weigh(&self, selector: &str, scope: &ScopePath) -> Weigh {
        if let Some(weigh) = self.cache.get(&(selector, scope) as &dyn WeighKey) {
            return *weigh;
        }
        let weigh = self.inner.weigh(selector, scope);
        if self.capacity > 0 {
            if self.cache.len() >= self.capacity {
                self.cache.clear();
            }
            self.cache.insert((Arc::from(selector), scope.clone()), weigh);
        }
        weigh
    }
}

impl<W: std::fmt::Debug> std::fmt::Debug for CachingWeigher<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingWeigher")
            .field("inner", &self.inner)
            .field("len", &self.cache.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
