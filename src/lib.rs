//! Personal-site edge server: a redirect-rules engine with a thin
//! HTTP layer around it.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod redirects;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use redirects::RedirectEngine;
