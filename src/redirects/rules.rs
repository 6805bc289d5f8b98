//! Redirect rule file parsing and compilation.
//!
//! # Responsibilities
//! - Parse the line-oriented rules text into compiled rules
//! - Detect the optional leading method column
//! - Drop malformed lines with a diagnostic, never abort compilation
//!
//! # Design Decisions
//! - Rule order is file order; the dispatcher stops at the first match
//! - A bad line costs only itself: it is logged, counted, and skipped
//! - Same-host destinations are parsed against a sentinel host that
//!   the dispatcher resolves to the incoming request's host

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::observability::metrics;
use crate::redirects::pattern::{PathPattern, PathTemplate, PatternError};

/// Placeholder host meaning "same host as the incoming request".
pub(crate) const SAME_HOST: &str = "same_host";

const RECOGNIZED_METHODS: &[&str] = &["HEAD", "GET", "POST", "PUT", "DELETE", "PATCH", "*"];

/// The HTTP methods a rule applies to.
#[derive(Debug, Clone)]
pub enum MethodSet {
    /// Rule applies to every method.
    Any,
    /// Rule applies only to the listed methods.
    Listed(Vec<Method>),
}

impl MethodSet {
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::Listed(methods) => methods.contains(method),
        }
    }
}

/// One compiled redirect rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct RedirectRule {
    pub methods: MethodSet,
    pub source: PathPattern,
    pub destination: PathTemplate,
    /// Scheme/host portion of the destination. Carries the
    /// [`SAME_HOST`] sentinel for relative destinations.
    pub base: Url,
    /// 1-based line number in the rules text, for diagnostics.
    pub line: usize,
}

/// Why a line was dropped during compilation.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("missing source or destination")]
    MissingDestination,

    #[error("invalid destination URL: {0}")]
    Destination(#[from] url::ParseError),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// A line excluded from the compiled set.
#[derive(Debug)]
pub struct DroppedLine {
    /// 1-based line number.
    pub line: usize,
    pub text: String,
    pub reason: RuleError,
}

/// Summary of one compilation pass.
#[derive(Debug, Default)]
pub struct CompileReport {
    pub compiled: usize,
    pub dropped: Vec<DroppedLine>,
}

/// The full ordered rule set, compiled once at startup.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RedirectRule>,
}

impl RuleSet {
    /// Compile a rules text blob. Malformed lines are logged with
    /// their line number and excluded; compilation itself never fails.
    pub fn parse(text: &str) -> (Self, CompileReport) {
        let mut rules = Vec::new();
        let mut report = CompileReport::default();

        for (index, raw) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match compile_line(line, line_number) {
                Ok(rule) => {
                    rules.push(rule);
                    report.compiled += 1;
                }
                Err(reason) => {
                    tracing::warn!(
                        line = line_number,
                        text = line,
                        error = %reason,
                        "dropping invalid redirect rule"
                    );
                    metrics::counter!(metrics::RULES_DROPPED).increment(1);
                    report.dropped.push(DroppedLine {
                        line: line_number,
                        text: line.to_string(),
                        reason,
                    });
                }
            }
        }

        (Self { rules }, report)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RedirectRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_line(line: &str, line_number: usize) -> Result<RedirectRule, RuleError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (one, two, three) = (
        tokens.first().copied(),
        tokens.get(1).copied(),
        tokens.get(2).copied(),
    );

    let Some(one) = one else {
        return Err(RuleError::MissingDestination);
    };

    let method_tokens: Vec<&str> = one.split(',').collect();
    let has_method_column = method_tokens
        .iter()
        .any(|m| RECOGNIZED_METHODS.contains(m));

    let (methods, from, to) = if has_method_column {
        (parse_methods(&method_tokens), two, three)
    } else {
        (MethodSet::Any, Some(one), two)
    };

    let (Some(from), Some(to)) = (from, to) else {
        return Err(RuleError::MissingDestination);
    };

    // A destination carrying `//` is an absolute URL (external host
    // allowed); anything else is a path on the incoming request's own
    // host, parsed against the sentinel.
    let base = if to.contains("//") {
        Url::parse(to)?
    } else {
        Url::parse(&format!("https://{SAME_HOST}{to}"))?
    };

    let source = PathPattern::compile(from)?;
    let destination = PathTemplate::compile(base.path())?;

    Ok(RedirectRule {
        methods,
        source,
        destination,
        base,
        line: line_number,
    })
}

fn parse_methods(tokens: &[&str]) -> MethodSet {
    if tokens.contains(&"*") {
        return MethodSet::Any;
    }
    MethodSet::Listed(
        tokens
            .iter()
            .filter_map(|t| Method::from_bytes(t.as_bytes()).ok())
            .collect(),
    )
}
