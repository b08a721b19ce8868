//! Back-reference substitution.
//!
//! End and while patterns may refer to text captured by the begin match
//! that opened their region (`\1`), and scope names may embed captured text
//! from their own match (`$1`).

use std::borrow::Cow;

use tm_ir::{LineText, MatchData};

/// Which reference syntax to substitute, and how.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BackReference {
    /// `\N`, substituted with regex-escaped text.
    Regex,
    /// `$N`, substituted verbatim.
    Scope,
}

impl BackReference {
    #[inline]
    const fn prefix(self) -> char {
        match self {
            BackReference::Regex => '\\',
            BackReference::Scope => '$',
        }
    }
}

/// Substitute every `<prefix><digits>` in `template` with the text of that
/// group in `source`.
///
/// The longest run of digits names the group. References to groups that do
/// not exist or did not participate are left as written. With no source
/// line or an unmatched `match_data`, the template is returned unchanged.
pub fn resolve<'t>(
    template: &'t str,
    source: Option<&LineText>,
    match_data: &MatchData,
    kind: BackReference,
) -> Cow<'t, str> {
    let prefix = kind.prefix();
    let Some(source) = source else {
        return Cow::Borrowed(template);
    };
    if !match_data.is_matched() || !template.contains(prefix) {
        return Cow::Borrowed(template);
    }

    let mut resolved = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(at) = rest.find(prefix) {
        resolved.push_str(&rest[..at]);
        // Both prefixes are single-byte ASCII.
        let after = &rest[at + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        let captured = after[..digits]
            .parse::<usize>()
            .ok()
            .and_then(|group| match_data.group(group))
            .and_then(|range| source.slice(range));

        match captured {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                match kind {
                    BackReference::Regex => resolved.push_str(&tm_regex::escape(&text)),
                    BackReference::Scope => resolved.push_str(&text),
                }
                rest = &after[digits..];
            }
            None => {
                resolved.push(prefix);
                rest = after;
            }
        }
    }
    resolved.push_str(rest);
    Cow::Owned(resolved)
}

#[cfg(test)]
mod tests;
