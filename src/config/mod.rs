//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → rules text resolved (inline or file)
//!     → shared with the HTTP layer at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no reload machinery
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_rules_text, ConfigError};
pub use schema::{ListenerConfig, ObservabilityConfig, RedirectsConfig, ServerConfig, TimeoutConfig};
