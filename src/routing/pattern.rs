//! Path patterns.
//!
//! # Syntax
//! ```text
//! /                      root
//! /login                 literal segments
//! /helloworld[/{name}]   literals followed by one optional trailing capture
//! ```
//!
//! # Design Decisions
//! - No regex: matching is a positional segment comparison
//! - At most one capture, and it must be the optional trailing group
//! - Literal comparison is case-sensitive
//! - An empty path segment never satisfies a capture (`/helloworld/` does not match)

use std::collections::HashMap;
use std::fmt;

use crate::routing::RouteError;

/// Parameters captured from a matched path.
pub type PathParams = HashMap<String, String>;

/// A compiled route template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    raw: String,
    literals: Vec<String>,
    optional: Option<String>,
}

impl PathPattern {
    /// Compile a pattern, rejecting anything outside the supported syntax.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }

        let (head, optional) = match raw.find('[') {
            Some(open) => {
                let group = &raw[open..];
                let inner = group
                    .strip_prefix("[/{")
                    .and_then(|g| g.strip_suffix("}]"))
                    .ok_or_else(|| invalid("optional group must be written as [/{name}] at the end"))?;
                if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(invalid("capture name must be a non-empty identifier"));
                }
                (&raw[..open], Some(inner.to_string()))
            }
            None => (raw, None),
        };

        if head.contains(['{', '}', ']']) {
            return Err(invalid("captures are only supported in the optional trailing group"));
        }

        let literals = split_segments(head)
            .map(|segments| segments.into_iter().map(str::to_string).collect())
            .ok_or_else(|| invalid("empty path segment"))?;

        Ok(Self {
            raw: raw.to_string(),
            literals,
            optional,
        })
    }

    /// The pattern as written in the routing metadata.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Name of the optional capture, if the pattern has one.
    pub fn capture_name(&self) -> Option<&str> {
        self.optional.as_deref()
    }

    /// Match a request path. Returns the captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let segments = split_request_path(path);
        let literal_count = self.literals.len();

        if segments.len() < literal_count {
            return None;
        }
        if self
            .literals
            .iter()
            .zip(&segments)
            .any(|(literal, segment)| literal != segment)
        {
            return None;
        }

        let rest = &segments[literal_count..];
        let mut params = PathParams::new();
        match (rest, &self.optional) {
            ([], _) => {}
            ([value], Some(name)) if !value.is_empty() => {
                params.insert(name.clone(), (*value).to_string());
            }
            _ => return None,
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split the literal part of a pattern. `None` if it contains an empty segment.
fn split_segments(head: &str) -> Option<Vec<&str>> {
    let trimmed = head.trim_start_matches('/');
    if trimmed.is_empty() {
        return Some(Vec::new());
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

fn split_request_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}
