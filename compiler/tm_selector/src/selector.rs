//! Default scope selector dialect.
//!
//! ```text
//! selector    := alternative ((',' | '|') alternative)*
//! alternative := [('L' | 'R' | 'B') ':'] path ('-' path)*
//! path        := scope-prefix*            (whitespace separated)
//! ```
//!
//! A scope prefix `a.b` matches the segment `a.b` and any `a.b.*`. A path
//! matches when its prefixes match segments of the scope path in order,
//! root to leaf, not necessarily adjacent. Deeper matches weigh more. Any
//! matching exclusion path zeroes the alternative. `L:` raises the
//! priority tier, `R:` lowers it.

use smallvec::SmallVec;
use tm_ir::{Priority, ScopePath};

use crate::{SelectorWeigher, Weigh};

/// Weight contributed per level of depth at which a prefix matched.
const DEPTH_WEIGHT: usize = 100;

type Path<'s> = SmallVec<[&'s str; 4]>;

struct Alternative<'s> {
    priority: Priority,
    path: Path<'s>,
    exclusions: SmallVec<[Path<'s>; 1]>,
}

fn parse(selector: &str) -> SmallVec<[Alternative<'_>; 2]> {
    selector.split([',', '|']).map(parse_alternative).collect()
}

fn parse_alternative(text: &str) -> Alternative<'_> {
    let mut text = text.trim_start();
    let mut priority = Priority::Normal;
    for (prefix, tier) in [("L:", Priority::High), ("R:", Priority::Low), ("B:", Priority::Normal)] {
        if let Some(rest) = text.strip_prefix(prefix) {
            priority = tier;
            text = rest;
            break;
        }
    }

    let mut path = Path::new();
    let mut exclusions: SmallVec<[Path<'_>; 1]> = SmallVec::new();
    for raw in text.split_whitespace() {
        let (starts_exclusion, token) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let token = token.trim_matches(|c| c == '(' || c == ')');
        if starts_exclusion {
            exclusions.push(Path::new());
        }
        if token.is_empty() {
            continue;
        }
        match exclusions.last_mut() {
            Some(exclusion) => exclusion.push(token),
            None => path.push(token),
        }
    }
    exclusions.retain(|p| !p.is_empty());

    Alternative {
        priority,
        path,
        exclusions,
    }
}

#[inline]
fn prefix_matches(prefix: &str, scope: &str) -> bool {
    scope
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Weight of `path` against `scopes` (root to leaf), or 0 if it does not
/// match. Prefixes are placed as deep as possible, innermost first.
fn path_weight(path: &[&str], scopes: &[&str]) -> usize {
    if path.is_empty() {
        return 1;
    }
    let mut weight = 0;
    let mut limit = scopes.len();
    for prefix in path.iter().rev() {
        let Some(index) = scopes[..limit]
            .iter()
            .rposition(|scope| prefix_matches(prefix, scope))
        else {
            return 0;
        };
        weight += (index + 1) * DEPTH_WEIGHT + prefix.split('.').count();
        limit = index;
    }
    weight
}

/// The default [`SelectorWeigher`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ScopeSelectorWeigher;

impl SelectorWeigher for ScopeSelectorWeigher {
    fn weigh(&self, selector: &str, scope: &ScopePath) -> Weigh {
        // A segment may carry several space-separated scope names.
        let scopes: SmallVec<[&str; 8]> = scope
            .names()
            .into_iter()
            .flat_map(str::split_whitespace)
            .collect();

        let mut best = Weigh::NONE;
        for alternative in parse(selector) {
            let excluded = alternative
                .exclusions
                .iter()
                .any(|exclusion| path_weight(exclusion, &scopes) > 0);
            if excluded {
                continue;
            }
            let weight = i32::try_from(path_weight(&alternative.path, &scopes)).unwrap_or(i32::MAX);
            if weight > best.weight {
                best = Weigh {
                    weight,
                    priority: alternative.priority,
                };
            }
        }
        best
    }
}
