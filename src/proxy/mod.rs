//! Framing proxy subsystem.
//!
//! # Data Flow
//! ```text
//! GET /proxy?url=<target>
//!     → handler.rs (validate url, forward User-Agent)
//!     → upstream.rs (fetch, decompress, buffer)
//!     → headers.rs (drop framing/encoding headers)
//!     → rewrite.rs (inject <base> for text/html only)
//!     → response to client
//! ```

pub mod error;
pub mod handler;
pub mod headers;
pub mod rewrite;
pub mod upstream;

pub use error::ProxyError;
pub use handler::proxy_handler;
pub use headers::filter_headers;
pub use rewrite::rewrite_html;
pub use upstream::Upstream;
