//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Logging/metrics → Scan pages → Pipeline → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal → broadcast → server drains, change loop stops
//!
//! Signals (signals.rs):
//!     SIGTERM/Ctrl+C → Shutdown::trigger
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{run_build, run_dev, run_serve, StartupError};
