//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route table build (startup, or structural file change):
//!     pages dir
//!     → scan.rs (collect page sources in declaration order)
//!     → route.rs (derive template + pattern per file)
//!     → router.rs (sort by priority, freeze as immutable RouteTable)
//!
//! Incoming pathname:
//!     → matcher.rs (decode, trailing slash policy)
//!     → router.rs (linear scan, first match wins)
//!     → Return: matched RouteData or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled once per generation, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - Route data is shared by `Arc`, never copied

pub mod matcher;
pub mod route;
pub mod router;
pub mod scan;

pub use matcher::{normalize_pathname, Params, RoutePattern, Segment};
pub use route::{ComponentRef, RouteData, RouteEntry, RouteId, RouteType};
pub use router::RouteTable;
pub use scan::{is_page_file, scan_pages};
