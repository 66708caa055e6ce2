//! Outbound fetch of proxy targets.
//!
//! # Responsibilities
//! - Hold one pooled HTTP client for all proxy requests
//! - Send GET with the caller's User-Agent or the configured default
//! - Return a fully buffered, decompressed body
//!
//! # Design Decisions
//! - gzip/brotli/deflate are negotiated and decoded by the client, so the
//!   body is always plain bytes and `content-encoding` no longer applies
//! - Timeouts come from config; a timeout is an upstream failure like any other

use std::time::Duration;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderValue, StatusCode},
};
use reqwest::{redirect, Client};
use url::Url;

use crate::config::FetchConfig;
use crate::proxy::error::ProxyError;

/// A completed upstream response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Final URL after redirects.
    pub url: Url,
    pub body: Bytes,
}

/// Shared outbound client.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    default_user_agent: String,
}

impl Upstream {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(redirect::Policy::limited(config.max_redirects));
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            default_user_agent: config.user_agent.clone(),
        })
    }

    /// GET `target`, forwarding `user_agent` when the caller sent one.
    pub async fn fetch(
        &self,
        target: &Url,
        user_agent: Option<&HeaderValue>,
    ) -> Result<UpstreamResponse, ProxyError> {
        let request = self.client.get(target.clone());
        let request = match user_agent {
            Some(ua) => request.header(header::USER_AGENT, ua.clone()),
            None => request.header(header::USER_AGENT, self.default_user_agent.as_str()),
        };

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;

        tracing::debug!(
            target_url = %target,
            final_url = %url,
            status = %status,
            bytes = body.len(),
            "Upstream fetch complete"
        );

        Ok(UpstreamResponse {
            status,
            headers,
            url,
            body,
        })
    }
}
