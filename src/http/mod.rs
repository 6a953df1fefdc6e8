//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body limit)
//!     → request.rs (PageRequest: absolute URL, headers, body, locals)
//!     → pipeline App::render
//!     → response.rs (PageResponse → axum Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Locals, PageRequest, X_REQUEST_ID};
pub use response::PageResponse;
pub use server::HttpServer;
