//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! proxy + relay subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP layer (see `http::request`)
//! - Metrics are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
