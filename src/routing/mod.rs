//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Table Compilation (at startup):
//!     ConfigDocument.endpoints[]
//!     → paths.rs (normalize test / websocket paths)
//!     → table.rs (validate, merge by address)
//!     → Freeze as immutable ListenerDefinition per address
//!
//! Incoming Request (path)
//!     → matcher.rs (ordered rules)
//!     → Return: StaticAsset | TestPage | WebSocket | NotFound
//! ```
//!
//! # Design Decisions
//! - Tables compiled at startup, immutable at runtime
//! - No regex in the request path
//! - Deterministic: same input always matches same rule

pub mod matcher;
pub mod paths;
pub mod table;

pub use matcher::{parse_static, RouteMatch};
pub use paths::{normalize_paths, EndpointPaths};
pub use table::{
    build_listeners, EndpointConfig, ListenerDefinition, MessageType, RoutingError, TlsMaterial,
};
