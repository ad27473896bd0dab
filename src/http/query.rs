//! Request path extraction module
//!
//! Pulls the untrusted asset path out of a URL, either from the path remainder
//! after a route prefix or from a query parameter. Values are percent-decoded
//! here so the sanitizer only ever sees literal segments.

use std::borrow::Cow;

/// Get a decoded query parameter, `+` meaning space
///
/// Returns `None` when the parameter is absent or fails to decode as UTF-8.
/// The first occurrence wins.
///
/// # Examples
/// ```
/// use protected_assets::http::query::query_param;
/// assert_eq!(query_param(Some("path=images%2Flogo.png"), "path").as_deref(), Some("images/logo.png"));
/// assert_eq!(query_param(Some("file=a.png"), "path"), None);
/// ```
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_form(key)? == name).then_some(value)
        })
        .next()
        .and_then(decode_form)
}

/// Decoded URL path remainder after `prefix`
///
/// `/api/protected-assets/images/a%20b.png` with prefix `/api/protected-assets`
/// yields `images/a b.png`. Returns `None` on invalid UTF-8 after decoding.
pub fn path_remainder(path: &str, prefix: &str) -> Option<String> {
    let rest = strip_prefix_ignore_case(path, prefix.trim_end_matches('/'))?;
    let rest = rest.trim_start_matches('/');
    urlencoding::decode(rest).ok().map(Cow::into_owned)
}

/// True when `path` is `prefix` itself or lies under it on a segment boundary
///
/// The prefix compares ASCII case-insensitively; the remainder is untouched.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    strip_prefix_ignore_case(path, prefix.trim_end_matches('/'))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn strip_prefix_ignore_case<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let head = path.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then_some(())?;
    path.get(prefix.len()..)
}

fn decode_form(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(Cow::into_owned)
}
