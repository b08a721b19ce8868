//! Scope selector weighing.
//!
//! Injections compete with a host grammar's own rules only when their
//! selector applies to the current scope path. A [`SelectorWeigher`] answers
//! "does it apply, how strongly, and with which priority tier"; the lexer
//! skips injections whose weight is not positive.
//!
//! - [`ScopeSelectorWeigher`]: the default selector dialect
//! - [`CachingWeigher`]: memoizes any weigher by (selector, scope path)

mod caching;
mod selector;

pub use caching::CachingWeigher;
pub use selector::ScopeSelectorWeigher;

use tm_ir::{Priority, ScopePath};

/// How well a selector applies to a scope path.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Weigh {
    /// `<= 0` means the selector does not apply.
    pub weight: i32,
    /// Tier used to break ties against candidates starting at the same offset.
    pub priority: Priority,
}

impl Weigh {
    pub const NONE: Weigh = Weigh {
        weight: 0,
        priority: Priority::Normal,
    };

    #[inline]
    pub fn applies(self) -> bool {
        self.weight > 0
    }
}

/// Selector weighing capability consumed by the lexer.
pub trait SelectorWeigher: Send + Sync {
    fn weigh(&self, selector: &str, scope: &ScopePath) -> Weigh;
}
