//! Path-pattern compilation and reverse templating.
//!
//! # Responsibilities
//! - Compile source patterns (`/blog/:slug`) into anchored matchers
//! - Extract named parameter values in pattern-position order
//! - Render destination templates with percent-encoded values
//!
//! # Design Decisions
//! - Dialect is intentionally small: a segment is either a literal or
//!   exactly one `:name` parameter. Modifiers (`?`, `+`, `*`, inline
//!   regex groups) are rejected at compile time.
//! - Matching is case-insensitive with an optional trailing slash.
//! - Captured values are substituted as-is and percent-encoded on
//!   render; the matcher never decodes the request path.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use thiserror::Error;

/// Characters escaped when substituting a parameter value into a
/// rendered path. Everything except unreserved characters and
/// `! ~ * ' ( )`, matching JavaScript's `encodeURIComponent` so rule
/// files behave identically across deployments.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Error raised while compiling a pattern or template.
///
/// Callers drop the offending rule line and continue; nothing here is
/// ever fatal to startup.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern must start with '/': `{0}`")]
    NotRooted(String),

    #[error("empty parameter name in segment `{0}`")]
    EmptyParam(String),

    #[error("unsupported syntax in segment `{0}`")]
    UnsupportedSyntax(String),

    #[error("pattern compiled to an invalid expression: {0}")]
    Regex(#[from] regex::Error),
}

/// One segment of a parsed pattern or template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

fn parse_segments(pattern: &str) -> Result<Vec<Segment>, PatternError> {
    let rest = pattern
        .strip_prefix('/')
        .ok_or_else(|| PatternError::NotRooted(pattern.to_string()))?;

    let mut raw: Vec<&str> = rest.split('/').collect();
    // Tolerate a single trailing slash in the source text.
    if raw.last() == Some(&"") {
        raw.pop();
    }

    let mut segments = Vec::with_capacity(raw.len());
    for seg in raw {
        if let Some(name) = seg.strip_prefix(':') {
            if name.is_empty() {
                return Err(PatternError::EmptyParam(seg.to_string()));
            }
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(PatternError::UnsupportedSyntax(seg.to_string()));
            }
            segments.push(Segment::Param(name.to_string()));
        } else {
            if seg.contains([':', '(', ')', '*', '+', '?']) {
                return Err(PatternError::UnsupportedSyntax(seg.to_string()));
            }
            segments.push(Segment::Literal(seg.to_string()));
        }
    }
    Ok(segments)
}

/// A compiled source pattern: tests a request path and extracts named
/// parameter values on success.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    keys: Vec<String>,
    source: String,
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let segments = parse_segments(pattern)?;

        let mut expr = String::from("(?i)^");
        let mut keys = Vec::new();
        for segment in &segments {
            expr.push('/');
            match segment {
                Segment::Literal(lit) => expr.push_str(&regex::escape(lit)),
                Segment::Param(name) => {
                    expr.push_str("([^/]+)");
                    keys.push(name.clone());
                }
            }
        }
        expr.push_str("/?$");

        Ok(Self {
            regex: Regex::new(&expr)?,
            keys,
            source: pattern.to_string(),
        })
    }

    /// Test `path` against the pattern. On a match, returns the
    /// extracted `(name, value)` pairs in pattern-position order.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.keys
                .iter()
                .enumerate()
                .filter_map(|(i, key)| {
                    caps.get(i + 1)
                        .map(|m| (key.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A compiled destination template: renders a concrete path from
/// parameter values extracted by a [`PathPattern`].
#[derive(Debug, Clone)]
pub struct PathTemplate {
    segments: Vec<Segment>,
    source: String,
}

impl PathTemplate {
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        Ok(Self {
            segments: parse_segments(template)?,
            source: template.to_string(),
        })
    }

    /// Render the template. Parameter values are percent-encoded; a
    /// parameter with no value drops its segment rather than erroring.
    pub fn render(&self, params: &[(String, String)]) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    path.push('/');
                    path.push_str(lit);
                }
                Segment::Param(name) => {
                    let value = params.iter().find(|(k, _)| k == name).map(|(_, v)| v);
                    if let Some(value) = value {
                        path.push('/');
                        path.push_str(&utf8_percent_encode(value, COMPONENT).to_string());
                    }
                }
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn literal_pattern_matches_exactly() {
        let p = PathPattern::compile("/about").unwrap();
        assert_eq!(p.captures("/about"), Some(vec![]));
        assert_eq!(p.captures("/about/"), Some(vec![]));
        assert!(p.captures("/about/me").is_none());
        assert!(p.captures("/abou").is_none());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let p = PathPattern::compile("/About").unwrap();
        assert!(p.captures("/about").is_some());
        assert!(p.captures("/ABOUT").is_some());
    }

    #[test]
    fn named_params_extract_in_order() {
        let p = PathPattern::compile("/blog/:year/:slug").unwrap();
        let caps = p.captures("/blog/2024/hello-world").unwrap();
        assert_eq!(caps, pairs(&[("year", "2024"), ("slug", "hello-world")]));
    }

    #[test]
    fn param_does_not_cross_segments() {
        let p = PathPattern::compile("/blog/:slug").unwrap();
        assert!(p.captures("/blog/a/b").is_none());
    }

    #[test]
    fn root_pattern_matches_root() {
        let p = PathPattern::compile("/").unwrap();
        assert!(p.captures("/").is_some());
        assert!(p.captures("/x").is_none());
    }

    #[test]
    fn literal_with_regex_metachars_is_escaped() {
        let p = PathPattern::compile("/v1.0/docs").unwrap();
        assert!(p.captures("/v1.0/docs").is_some());
        assert!(p.captures("/v1x0/docs").is_none());
    }

    #[test]
    fn modifiers_are_rejected() {
        assert!(matches!(
            PathPattern::compile("/files/:name?"),
            Err(PatternError::UnsupportedSyntax(_))
        ));
        assert!(matches!(
            PathPattern::compile("/a/(.*)"),
            Err(PatternError::UnsupportedSyntax(_))
        ));
        assert!(matches!(
            PathPattern::compile("no-slash"),
            Err(PatternError::NotRooted(_))
        ));
    }

    #[test]
    fn render_substitutes_and_encodes() {
        let t = PathTemplate::compile("/new/:id").unwrap();
        assert_eq!(t.render(&pairs(&[("id", "42")])), "/new/42");
        assert_eq!(t.render(&pairs(&[("id", "a b/c")])), "/new/a%20b%2Fc");
    }

    #[test]
    fn render_reencodes_already_encoded_values() {
        // Captured values come from the raw (encoded) request path and
        // are encoded again on render.
        let t = PathTemplate::compile("/new/:id").unwrap();
        assert_eq!(t.render(&pairs(&[("id", "a%20b")])), "/new/a%2520b");
    }

    #[test]
    fn render_omits_missing_params() {
        let t = PathTemplate::compile("/new/:id/detail").unwrap();
        assert_eq!(t.render(&[]), "/new/detail");
    }

    #[test]
    fn render_empty_template_yields_root() {
        let t = PathTemplate::compile("/").unwrap();
        assert_eq!(t.render(&[]), "/");
    }
}
