//! Tokenization helpers for scheme-qualified, slash-delimited names.
//!
//! A full name looks like `"<scheme>:<segment>(/<segment>)*"`. The scheme
//! prefix is optional on recursive calls, where it has already been
//! stripped at the root.

/// Strip a leading `"<scheme>:"` prefix if present.
pub(crate) fn strip_scheme<'a>(name: &'a str, scheme: &str) -> &'a str {
    match name
        .strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix(':'))
    {
        Some(rest) => rest,
        None => name,
    }
}

/// Iterate the non-empty `/`-separated segments of a name.
///
/// Empty segments are skipped, so `"a//b"`, `"/a/b"` and `"a/b/"` all
/// tokenize like `"a/b"`, and a bare scheme with no path yields no tokens.
pub(crate) fn tokens(name: &str) -> impl Iterator<Item = &str> {
    name.split('/').filter(|segment| !segment.is_empty())
}

/// Strip a leading `"<segment>/"` from a name.
///
/// Returns the name unchanged when it does not start with the full
/// segment, so a match on a later token passes the name through untouched.
pub(crate) fn strip_leading<'a>(name: &'a str, segment: &str) -> &'a str {
    match name.strip_prefix(segment) {
        Some(rest) if rest.is_empty() => "",
        Some(rest) => match rest.strip_prefix('/') {
            Some(stripped) => stripped,
            None => name,
        },
        None => name,
    }
}
