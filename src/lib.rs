//! Framing proxy and WebSocket room relay.
//!
//! Two services behind one listener:
//! - `GET /proxy?url=...` fetches a page, strips the headers that block
//!   framing and points relative resources back at the page's origin
//! - WebSocket connections join rooms where controllers drive viewers and
//!   viewers report back

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod relay;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
