//! Redirect-rules engine.
//!
//! # Data Flow
//! ```text
//! Rule Compilation (at startup):
//!     rules text (one rule per line)
//!     → rules.rs (line grammar, method column, destination URL)
//!     → pattern.rs (source matcher + destination template)
//!     → Freeze as immutable RuleSet
//!
//! Per Request:
//!     RequestContext (method, path, host, query)
//!     → engine.rs (ordered scan, first match wins)
//!     → Some(Url) for a 307, or None (pass through)
//! ```
//!
//! # Design Decisions
//! - Rules compiled once, immutable at runtime, shared without locks
//! - First match wins; at most one rule fires per request
//! - Every fault is contained: a bad line is dropped at compile time,
//!   a bad rule is skipped at match time, and nothing here ever turns
//!   into an error response

pub mod engine;
pub mod pattern;
pub mod rules;

pub use engine::{RedirectEngine, RequestContext};
pub use rules::{CompileReport, RuleSet};
