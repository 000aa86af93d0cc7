//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → ConfigDocument (raw endpoint descriptions)
//!     → routing::table (semantic checks, merge by address)
//!     → ListenerDefinition[] (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - Every field has a default so minimal documents parse
//! - Syntax errors come from serde, semantic errors from the routing builder

pub mod loader;
pub mod schema;

pub use loader::{load_config, write_default_config, ConfigError, DEFAULT_CONFIG};
pub use schema::{
    ConfigDocument, EndpointDescription, ObservabilityConfig, PropertyMap, PropertyValue,
};
