//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerDefinition.address
//!     → listener.rs (":port" shorthand, resolution)
//!     → tls.rs (optional rustls config from PEM files)
//!     → http::server (axum / axum-server)
//!
//! Upgraded websocket
//!     → connection.rs (connection ID, live connection tracking)
//! ```
//!
//! # Design Decisions
//! - One listener per distinct address
//! - TLS is all-or-nothing and shared by every listener
//! - A listener that cannot bind takes the process down

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{normalize_bind_address, resolve_bind_address, ListenerError};
