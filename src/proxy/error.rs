//! Proxy error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The `url` query parameter is absent.
    #[error("Missing required query parameter: url")]
    MissingUrl,

    /// The `url` parameter is not an absolute URL with a host.
    #[error("Invalid target URL: {0}")]
    InvalidUrl(String),

    /// DNS, TLS, connect, timeout or body read failure.
    #[error("Proxy fetch failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingUrl | ProxyError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProxyError::MissingUrl | ProxyError::InvalidUrl(_) => "bad_request",
            ProxyError::Upstream(_) => "upstream_error",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
