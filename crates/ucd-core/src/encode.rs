//! Percent-encoding for caller-supplied URL segments.
//!
//! Every string a resource client splices into a path segment or query value
//! goes through [`encode_path`], so a value containing `/`, `?` or `&` can never
//! span the boundaries of the endpoint it was meant for.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except ASCII alphanumerics and `-`, `_`, `.`, `~`.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a value for use as a single URL path segment or query value.
///
/// Unreserved characters pass through unchanged; every other byte of the UTF-8
/// encoding becomes `%XX` with uppercase hex digits.
#[must_use]
pub fn encode_path(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}
