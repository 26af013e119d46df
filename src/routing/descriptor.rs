//! Routing metadata and the descriptors compiled from it.

use std::collections::BTreeMap;

use crate::routing::pattern::{PathParams, PathPattern};
use crate::routing::verb::{Verb, VerbSet};
use crate::routing::RouteError;

/// Routing metadata attached to a controller action.
///
/// Verbs are kept as raw tokens until discovery so that an invalid token is
/// reported as a startup error with the offending controller and action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlAttribute {
    path: String,
    verbs: Vec<String>,
    defaults: Vec<(String, String)>,
}

impl UrlAttribute {
    /// A route answering `GET` on `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            verbs: vec![Verb::Get.as_str().to_string()],
            defaults: Vec::new(),
        }
    }

    /// A route answering the given verbs on `path`.
    pub fn with_verbs<I, S>(path: impl Into<String>, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(path).verbs(verbs)
    }

    /// Replace the verb list.
    pub fn verbs<I, S>(mut self, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verbs = verbs.into_iter().map(Into::into).collect();
        self
    }

    /// Value bound to the optional capture when the request omits it.
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.push((name.into(), value.into()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw_verbs(&self) -> &[String] {
        &self.verbs
    }
}

/// Immutable description of one registered endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pattern: PathPattern,
    verbs: VerbSet,
    controller: &'static str,
    action: &'static str,
    defaults: BTreeMap<String, String>,
}

impl RouteDescriptor {
    /// Validate routing metadata and bind it to `controller::action`.
    pub fn new(
        attribute: &UrlAttribute,
        controller: &'static str,
        action: &'static str,
    ) -> Result<Self, RouteError> {
        let pattern = PathPattern::parse(&attribute.path)?;
        let verbs = VerbSet::parse(&attribute.verbs)?;

        let mut defaults = BTreeMap::new();
        for (name, value) in &attribute.defaults {
            if pattern.capture_name() != Some(name.as_str()) {
                return Err(RouteError::UnknownDefault {
                    pattern: pattern.to_string(),
                    name: name.clone(),
                });
            }
            defaults.insert(name.clone(), value.clone());
        }

        Ok(Self {
            pattern,
            verbs,
            controller,
            action,
            defaults,
        })
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn verbs(&self) -> VerbSet {
        self.verbs
    }

    pub fn controller(&self) -> &'static str {
        self.controller
    }

    pub fn action(&self) -> &'static str {
        self.action
    }

    /// `Controller::action`, used in logs and error pages.
    pub fn target(&self) -> String {
        format!("{}::{}", self.controller, self.action)
    }

    /// Apply declared defaults for captures the request left out.
    pub fn with_defaults(&self, mut params: PathParams) -> PathParams {
        for (name, value) in &self.defaults {
            params.entry(name.clone()).or_insert_with(|| value.clone());
        }
        params
    }

    /// One `(verb, pattern, target)` triple per registered verb.
    pub fn triples(&self) -> impl Iterator<Item = (Verb, String, String)> + '_ {
        self.verbs
            .iter()
            .map(move |verb| (verb, self.pattern.to_string(), self.target()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_get() {
        let attr = UrlAttribute::new("/whoops");
        let descriptor = RouteDescriptor::new(&attr, "WhoopsTest", "whoops").unwrap();
        assert_eq!(descriptor.verbs().iter().collect::<Vec<_>>(), vec![Verb::Get]);
        assert_eq!(descriptor.target(), "WhoopsTest::whoops");
    }

    #[test]
    fn test_invalid_verb_fails_validation() {
        let attr = UrlAttribute::with_verbs("/login", ["GET", "TRACE"]);
        let err = RouteDescriptor::new(&attr, "Login", "login_get").unwrap_err();
        assert!(matches!(err, RouteError::InvalidVerb { ref token, .. } if token == "TRACE"));
    }

    #[test]
    fn test_default_only_for_capture() {
        let attr = UrlAttribute::new("/helloworld[/{name}]").with_default("who", "x");
        assert!(matches!(
            RouteDescriptor::new(&attr, "Index", "hello"),
            Err(RouteError::UnknownDefault { .. })
        ));
    }

    #[test]
    fn test_with_defaults_keeps_captured_value() {
        let attr = UrlAttribute::new("/helloworld[/{name}]").with_default("name", "World");
        let descriptor = RouteDescriptor::new(&attr, "Index", "hello").unwrap();

        let filled = descriptor.with_defaults(PathParams::new());
        assert_eq!(filled.get("name").map(String::as_str), Some("World"));

        let captured = descriptor.pattern().matches("/helloworld/alice").unwrap();
        let kept = descriptor.with_defaults(captured);
        assert_eq!(kept.get("name").map(String::as_str), Some("alice"));
    }
}
