//! Template rendering.

use std::fmt;

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use thiserror::Error;

use crate::config::TemplateConfig;
use crate::container::{Injectable, ResolveError, Resolver};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{name}` must end in `.{extension}`")]
    Extension { name: String, extension: String },

    #[error(transparent)]
    Render(#[from] minijinja::Error),
}

/// File-backed template renderer shared by all controllers.
pub struct Templates {
    env: Environment<'static>,
    extension: String,
}

impl Templates {
    pub fn new(config: &TemplateConfig) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(&config.directory));
        if config.strict_variables {
            env.set_undefined_behavior(UndefinedBehavior::Strict);
        }
        Self {
            env,
            extension: config.extension.clone(),
        }
    }

    /// Render template `name` with `data`.
    pub fn render<S: Serialize>(&self, name: &str, data: S) -> Result<String, TemplateError> {
        let has_extension = name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext == self.extension);
        if !has_extension {
            return Err(TemplateError::Extension {
                name: name.to_string(),
                extension: self.extension.clone(),
            });
        }

        let template = self.env.get_template(name)?;
        Ok(template.render(data)?)
    }
}

impl fmt::Debug for Templates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Templates")
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl Injectable for Templates {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        let config = resolver.resolve::<TemplateConfig>()?;
        if !config.directory.is_dir() {
            tracing::warn!(directory = %config.directory.display(), "Template directory not found");
        }
        Ok(Self::new(&config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn templates(strict: bool) -> (tempfile::TempDir, Templates) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.html"), "Hello {{ name }}!").unwrap();
        let config = TemplateConfig {
            directory: dir.path().to_path_buf(),
            extension: "html".into(),
            strict_variables: strict,
        };
        let templates = Templates::new(&config);
        (dir, templates)
    }

    #[test]
    fn test_render_escapes_html() {
        let (_dir, templates) = templates(false);
        let out = templates.render("hello.html", json!({ "name": "<b>Ada" })).unwrap();
        assert_eq!(out, "Hello &lt;b&gt;Ada!");
    }

    #[test]
    fn test_rejects_foreign_extension() {
        let (_dir, templates) = templates(false);
        assert!(matches!(
            templates.render("hello.txt", json!({})),
            Err(TemplateError::Extension { .. })
        ));
    }

    #[test]
    fn test_strict_variables() {
        let (_dir, lenient) = templates(false);
        assert_eq!(lenient.render("hello.html", json!({})).unwrap(), "Hello !");

        let (_dir, strict) = templates(true);
        assert!(matches!(
            strict.render("hello.html", json!({})),
            Err(TemplateError::Render(_))
        ));
    }

    #[test]
    fn test_missing_template() {
        let (_dir, templates) = templates(false);
        assert!(templates.render("absent.html", json!({})).is_err());
    }
}
