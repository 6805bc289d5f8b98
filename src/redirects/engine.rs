//! Redirect matching and destination construction.
//!
//! # Data Flow
//! ```text
//! RequestContext (method, path, host, query)
//!     → iterate rules in file order
//!     → skip on method mismatch
//!     → first source-pattern match wins
//!     → clone destination base, force scheme,
//!       resolve same-host sentinel, merge query,
//!       render destination path
//!     → Url for a 307, or None (pass through)
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime; shared via Arc
//!   with no locking
//! - At most one rule fires per request
//! - A fault in one rule is logged and treated as a non-match; the
//!   scan continues with the next rule

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::observability::metrics;
use crate::redirects::rules::{CompileReport, RedirectRule, RuleSet, SAME_HOST};

/// The routing-relevant slice of an incoming request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Raw (still percent-encoded) request path.
    pub path: String,
    /// Resolved host, possibly including a port. Taken from
    /// `X-Forwarded-Host` with `Host` as the fallback.
    pub host: String,
    /// Incoming query pairs in order of appearance.
    pub query: Vec<(String, String)>,
}

impl RequestContext {
    /// Local development is the only place the site answers plain
    /// HTTP; everywhere else the edge terminates TLS.
    pub fn protocol(&self) -> &'static str {
        if self.host.contains("localhost") {
            "http"
        } else {
            "https"
        }
    }
}

/// Fault while building the destination URL for a matched rule.
/// Always treated as "this rule did not match".
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("destination scheme could not be set to `{0}`")]
    Scheme(&'static str),

    #[error("invalid redirect host: {0}")]
    Host(#[from] url::ParseError),

    #[error("destination URL cannot carry a port")]
    Port,
}

/// The compiled redirect engine. Construct once at startup, share
/// read-only across request handlers.
#[derive(Debug, Clone, Default)]
pub struct RedirectEngine {
    rules: RuleSet,
}

impl RedirectEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Compile a rules text blob into an engine, reporting dropped
    /// lines alongside.
    pub fn from_rules_text(text: &str) -> (Self, CompileReport) {
        let (rules, report) = RuleSet::parse(text);
        (Self::new(rules), report)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Find the first rule matching the request and build its
    /// destination URL. `None` means the caller should pass the
    /// request to the next handler.
    pub fn match_request(&self, ctx: &RequestContext) -> Option<Url> {
        for rule in self.rules.iter() {
            if !rule.methods.allows(&ctx.method) {
                continue;
            }
            let Some(params) = rule.source.captures(&ctx.path) else {
                continue;
            };

            match build_destination(rule, ctx, &params) {
                Ok(dest) => {
                    metrics::counter!(metrics::REDIRECTS_MATCHED).increment(1);
                    tracing::debug!(
                        rule_line = rule.line,
                        source = rule.source.source(),
                        destination = %dest,
                        "redirect rule matched"
                    );
                    return Some(dest);
                }
                Err(error) => {
                    // One bad rule must not fail the request.
                    metrics::counter!(metrics::RULE_ERRORS).increment(1);
                    tracing::error!(
                        rule_line = rule.line,
                        source = rule.source.source(),
                        path = %ctx.path,
                        host = %ctx.host,
                        %error,
                        "error rendering redirect destination, trying next rule"
                    );
                }
            }
        }
        None
    }
}

fn build_destination(
    rule: &RedirectRule,
    ctx: &RequestContext,
    params: &[(String, String)],
) -> Result<Url, MatchError> {
    let mut dest = rule.base.clone();

    let protocol = ctx.protocol();
    dest.set_scheme(protocol)
        .map_err(|_| MatchError::Scheme(protocol))?;

    if dest.host_str() == Some(SAME_HOST) {
        let (host, port) = split_host_port(&ctx.host);
        dest.set_host(Some(host))?;
        dest.set_port(port).map_err(|_| MatchError::Port)?;
    }

    // Additive merge: the destination's own query pairs stay first,
    // the incoming request's pairs are appended after them.
    if !ctx.query.is_empty() {
        dest.query_pairs_mut()
            .extend_pairs(ctx.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    dest.set_path(&rule.destination.render(params));
    Ok(dest)
}

/// Split an authority-style host header into host and port. Bracketed
/// IPv6 literals keep their brackets.
fn split_host_port(host: &str) -> (&str, Option<u16>) {
    match host.rsplit_once(':') {
        Some((h, p)) if !h.contains(':') || h.ends_with(']') => match p.parse::<u16>() {
            Ok(port) => (h, Some(port)),
            Err(_) => (host, None),
        },
        _ => (host, None),
    }
}
