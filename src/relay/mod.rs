//! WebSocket room relay subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket upgrade (?type=viewer|controller&room=<id>)
//!     → session.rs (per-connection task, state machine)
//!     → registry.rs (room membership, fan-out)
//!     → message.rs (raw frame vs viewer envelope)
//!     → peers' outbound queues → their sockets
//! ```
//!
//! # Design Decisions
//! - Controllers talk to viewers, viewers talk back to controllers
//! - Rooms are created on first join and dropped with their last member
//! - Delivery is best-effort: no queuing beyond a small per-peer buffer, no retries

pub mod connection;
pub mod message;
pub mod registry;
pub mod session;

pub use connection::{ConnectionId, ConnectionState, ConnectionTracker};
pub use message::{RelayFrame, RelayPayload, Role, ViewerEnvelope};
pub use registry::{Delivery, MemberCounts, Membership, RoomRegistry};
pub use session::{Session, SessionParams};
