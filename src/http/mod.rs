//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, host/query extraction)
//!     → redirect middleware (first matching rule → 307)
//!     → handlers.rs (standalone endpoints, site fallback)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{X_FORWARDED_HOST, X_REQUEST_ID};
pub use server::HttpServer;
