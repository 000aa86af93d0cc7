//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! listeners, bridges, builder:
//!     → logging.rs (structured log events, connection IDs)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
