//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Connection (shutdown.rs):
//!     read-detector ─┐
//!                    ├─ trigger() ─▶ ShutdownSignal ─▶ event-pump stops
//!     write failure ─┘
//!
//! Process (signals.rs):
//!     SIGINT → return from main (no draining)
//! ```
//!
//! # Design Decisions
//! - One signal per connection; first trigger wins, later ones are no-ops
//! - Listener failures and interrupts end the process immediately

pub mod shutdown;
pub mod signals;

pub use shutdown::ShutdownSignal;
pub use signals::wait_for_interrupt;
