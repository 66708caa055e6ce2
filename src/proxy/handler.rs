//! `GET /proxy?url=...` handler.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use url::Url;

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::headers::{filter_headers, DEFAULT_CONTENT_TYPE};
use crate::proxy::rewrite::{is_html, rewrite_html};
use crate::proxy::upstream::{Upstream, UpstreamResponse};

/// Framing headers hyper recomputes for the body we actually send.
const RECOMPUTED: [HeaderName; 3] = [
    header::CONTENT_LENGTH,
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
];

#[derive(Debug, Default, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

pub async fn proxy_handler(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
    headers: HeaderMap,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers).to_owned();

    match proxy(&state.upstream, params, &headers).await {
        Ok(response) => {
            metrics::record_proxy("ok", start_time);
            response
        }
        Err(err) => {
            match &err {
                ProxyError::Upstream(e) => {
                    tracing::warn!(request_id = %request_id, error = %e, "Upstream fetch failed");
                }
                other => {
                    tracing::debug!(request_id = %request_id, error = %other, "Rejected proxy request");
                }
            }
            metrics::record_proxy(err.outcome(), start_time);
            err.into_response()
        }
    }
}

/// Validate the target, fetch it and build the client response.
pub async fn proxy(
    upstream: &Upstream,
    params: ProxyParams,
    headers: &HeaderMap,
) -> Result<Response, ProxyError> {
    let raw = params.url.ok_or(ProxyError::MissingUrl)?;
    let target = parse_target(&raw)?;

    tracing::debug!(target_url = %target, "Proxying request");

    let fetched = upstream
        .fetch(&target, headers.get(header::USER_AGENT))
        .await?;
    Ok(build_response(fetched))
}

/// Parse an absolute http(s) URL with a host.
pub fn parse_target(raw: &str) -> Result<Url, ProxyError> {
    let url = Url::parse(raw.trim()).map_err(|e| ProxyError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyError::InvalidUrl(format!(
            "unsupported scheme `{}`",
            url.scheme()
        )));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ProxyError::InvalidUrl("missing host".to_string())),
    }
}

/// Filter headers, pin the content type and rewrite HTML bodies.
pub fn build_response(fetched: UpstreamResponse) -> Response {
    let content_type = fetched
        .headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut headers = filter_headers(&fetched.headers);
    for name in RECOMPUTED.iter() {
        headers.remove(name);
    }
    headers.insert(header::CONTENT_TYPE, content_type.clone());

    let body = if is_html(&String::from_utf8_lossy(content_type.as_bytes())) {
        rewrite_html(&fetched.body, &fetched.url)
    } else {
        fetched.body
    };

    let mut response = Body::from(body).into_response();
    *response.status_mut() = fetched.status;
    *response.headers_mut() = headers;
    response
}
