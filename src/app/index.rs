use std::sync::Arc;

use minijinja::context;

use crate::container::{Injectable, ResolveError, Resolver};
use crate::controller::{Action, ActionContext, ActionResult, Controller};
use crate::routing::UrlAttribute;
use crate::services::Templates;

pub struct Index {
    templates: Arc<Templates>,
}

impl Injectable for Index {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            templates: resolver.resolve()?,
        })
    }
}

impl Controller for Index {
    const NAME: &'static str = "Index";

    fn actions() -> Vec<Action<Self>> {
        vec![
            Action::new("index", Self::index).route(UrlAttribute::new("/")),
            Action::new("hello", Self::hello)
                .route(UrlAttribute::new("/helloworld[/{name}]").with_default("name", "World")),
        ]
    }
}

impl Index {
    async fn index(self: Arc<Self>, mut cx: ActionContext) -> ActionResult {
        cx.preload("/css/site.css");
        let page = context! { url => cx.full_path() };
        Ok(cx.reply().cache_for(60).render(&self.templates, "index.html", page)?)
    }

    async fn hello(self: Arc<Self>, cx: ActionContext) -> ActionResult {
        let name = cx.arg("name").unwrap_or("World");
        if cx.param("format") == Some("json") {
            return Ok(cx.reply().json(&serde_json::json!({ "greeting": format!("Hello {name}!") }))?);
        }
        Ok(cx.reply().render(&self.templates, "hello.html", context! { name })?)
    }
}
