//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, timeout, CORS)
//! - Dispatch WebSocket upgrades on any path to the room relay
//! - Serve static files for everything else
//! - Bind server to listener and drain on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{FromRequestParts, Query, State, WebSocketUpgrade},
    http::{header, HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::{cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{RoomsConfig, ServerConfig};
use crate::http::health::health_handler;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::Shutdown;
use crate::proxy::{proxy_handler, Upstream};
use crate::relay::session::{self, SessionParams};
use crate::relay::{ConnectionTracker, RoomRegistry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Upstream,
    pub registry: Arc<RoomRegistry>,
    pub connections: ConnectionTracker,
    pub rooms: Arc<RoomsConfig>,
    pub shutdown: Shutdown,
    pub static_files: Option<ServeDir>,
}

/// HTTP server for the proxy and the relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig, shutdown: Shutdown) -> Result<Self, reqwest::Error> {
        let static_files = config
            .static_files
            .enabled
            .then(|| ServeDir::new(&config.static_files.dir));

        let state = AppState {
            upstream: Upstream::new(&config.fetch)?,
            registry: Arc::new(RoomRegistry::new()),
            connections: ConnectionTracker::new(),
            rooms: Arc::new(config.relay.clone()),
            shutdown,
            static_files,
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/proxy", get(proxy_handler))
            .route("/health", get(health_handler))
            .fallback(static_handler)
            .layer(middleware::from_fn_with_state(state.clone(), relay_upgrade))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CorsLayer::permissive())
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener until shutdown.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shutdown = self.state.shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(Shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The room registry shared by all relay sessions.
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// Live relay connection counter.
    pub fn connections(&self) -> ConnectionTracker {
        self.state.connections.clone()
    }
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

/// Hand WebSocket upgrades on any path to the relay, ahead of route matching.
async fn relay_upgrade(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_websocket_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, _body) = request.into_parts();
    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    let params = match Query::<SessionParams>::try_from_uri(&parts.uri) {
        Ok(Query(params)) => params,
        Err(rejection) => return rejection.into_response(),
    };
    session::accept(ws, params, &state)
}

/// Everything that is neither an upgrade nor an API route.
async fn static_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state.static_files {
        Some(files) => files.oneshot(request).await.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn upgrade_detection_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        assert!(!is_websocket_upgrade(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(is_websocket_upgrade(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_websocket_upgrade(&headers));
    }
}
