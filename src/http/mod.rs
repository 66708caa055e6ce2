//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (request ID set and echoed)
//!     → upgrade  → relay::session (any path, checked before routing)
//!     → /proxy   → proxy::handler
//!     → /health  → health.rs
//!     → else     → static files
//! ```

pub mod health;
pub mod request;
pub mod server;

pub use request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
