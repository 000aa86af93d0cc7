//! Kafka to WebSocket bridge library.

pub mod bridge;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::ConfigDocument;
pub use http::ListenerServer;
pub use routing::{build_listeners, ListenerDefinition};

/// Product version printed by `kws -v`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Release name printed next to the version.
pub const RELEASE_TAG: &str = "lola simon";
