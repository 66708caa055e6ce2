//! Response header filtering.
//!
//! # Responsibilities
//! - Drop headers that stop the page from being framed or rewritten
//! - Drop encoding metadata that no longer matches the re-served body
//!
//! # Design Decisions
//! - `HeaderName` is always lowercase, so comparisons are case-insensitive by construction
//! - Every surviving value is kept, duplicates included, in upstream order

use axum::http::{header, HeaderMap, HeaderName};

/// Headers removed from every upstream response.
pub const DENY_LIST: [HeaderName; 6] = [
    header::X_FRAME_OPTIONS,
    header::CONTENT_SECURITY_POLICY,
    header::CONTENT_SECURITY_POLICY_REPORT_ONLY,
    header::STRICT_TRANSPORT_SECURITY,
    header::CONTENT_ENCODING,
    header::TRANSFER_ENCODING,
];

/// Content type assumed when the upstream does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Returns true if `name` is on the deny-list.
pub fn is_denied(name: &HeaderName) -> bool {
    DENY_LIST.contains(name)
}

/// Copy every header except the deny-listed ones.
pub fn filter_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if !is_denied(name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}
