//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, single fallback handler)
//!     → routing::matcher (StaticAsset | TestPage | WebSocket | NotFound)
//!         → assets.rs (embedded files, test page template)
//!         → websocket.rs (upgrade, spawn bridge)
//!         → 404
//! ```

pub mod assets;
pub mod server;
pub mod websocket;

pub use assets::{content_type, AssetSource, TestPageCache, TestPageTemplate};
pub use server::{ListenerServer, ListenerState};
