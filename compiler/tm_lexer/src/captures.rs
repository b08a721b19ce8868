//! Ordering of capture scopes.
//!
//! A match's captured groups become nested scopes inside the match's own
//! scope. Groups are reported by number, but their ranges nest in text
//! order, so the opens and closes have to be interleaved by position.

use smallvec::SmallVec;
use tm_ir::{ByteRange, CaptureMap, MatchData};

/// One step of the capture scope walk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CaptureEvent<'r> {
    /// Open the scope named by the (unresolved) template `name` at `offset`.
    Open {
        group: usize,
        offset: usize,
        name: &'r str,
    },
    /// Close the innermost open capture scope at `offset`.
    Close { group: usize, offset: usize },
}

struct Span<'r> {
    group: usize,
    range: ByteRange,
    name: &'r str,
}

/// Interleave the opens and closes of every capture of `match_data` that has
/// a name and a non-empty range.
///
/// Opens are taken by (start, group) and closes by (end, reverse group); at
/// each step the next close goes first if its group number is lower than
/// the next open's. For ranges produced by one regex match this yields a
/// well-nested walk.
pub fn order_captures<'r>(
    captures: &'r CaptureMap,
    match_data: &MatchData,
) -> SmallVec<[CaptureEvent<'r>; 8]> {
    let spans: SmallVec<[Span<'r>; 4]> = captures
        .iter()
        .filter(|(_, name)| !name.is_empty())
        .filter_map(|(group, name)| {
            let range = match_data.group(group)?;
            (!range.is_empty()).then_some(Span { group, range, name })
        })
        .collect();

    // Both lists are consumed from the back.
    let mut starts: SmallVec<[&Span<'r>; 4]> = spans.iter().collect();
    starts.sort_by(|a, b| {
        b.range
            .start
            .cmp(&a.range.start)
            .then(b.group.cmp(&a.group))
    });
    let mut ends: SmallVec<[&Span<'r>; 4]> = spans.iter().collect();
    ends.sort_by(|a, b| b.range.end.cmp(&a.range.end).then(a.group.cmp(&b.group)));

    let mut events = SmallVec::new();
    while let Some(&close) = ends.last() {
        match starts.last() {
            Some(&open) if close.group >= open.group => {
                starts.pop();
                events.push(CaptureEvent::Open {
                    group: open.group,
                    offset: open.range.start,
                    name: open.name,
                });
            }
            _ => {
                ends.pop();
                events.push(CaptureEvent::Close {
                    group: close.group,
                    offset: close.range.end,
                });
            }
        }
    }
    events
}
