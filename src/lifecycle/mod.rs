//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed loop observes the flag
//!     → updater finishes its current drain cycle, withdraws what is still queued, exits
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Shutdown is a level, not an event: late subscribers still see it
//! - In-flight pool updates are never cancelled

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
