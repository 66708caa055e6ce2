//! HTML `<head>` injection.
//!
//! A single pass finds the first opening `<head>` tag and inserts a `<base>`
//! element pointing at the target origin, followed by a provenance `<meta>`.
//! The rest of the document is not parsed and stays byte-identical.

use std::sync::LazyLock;

use axum::body::Bytes;
use regex::bytes::Regex;
use url::Url;

/// `<head>`, `<HEAD lang="en">`, `<head/>`; never `<header>`.
static HEAD_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i-u)<head(?:\s[^>]*|/)?>").expect("head tag pattern is valid")
});

/// Name of the provenance `<meta>` element.
pub const PROVENANCE_META: &str = "x-proxied-from";

/// Returns true for content types the rewriter applies to.
pub fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

/// Scheme, host and non-default port of `url`.
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Inject `<base href="{origin}">` after the first `<head>` tag of `body`.
///
/// Bodies without a `<head>` tag are returned unchanged. Applying this twice
/// inserts a second `<base>`.
pub fn rewrite_html(body: &[u8], target: &Url) -> Bytes {
    let Some(head) = HEAD_TAG.find(body) else {
        return Bytes::copy_from_slice(body);
    };

    let injection = format!(
        r#"<base href="{}"><meta name="{}" content="{}">"#,
        escape_attr(&origin_of(target)),
        PROVENANCE_META,
        escape_attr(target.as_str()),
    );

    let mut out = Vec::with_capacity(body.len() + injection.len());
    out.extend_from_slice(&body[..head.end()]);
    out.extend_from_slice(injection.as_bytes());
    out.extend_from_slice(&body[head.end()..]);
    Bytes::from(out)
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
