use std::sync::Arc;

use minijinja::context;

use super::LOGGED_IN;
use crate::container::{Injectable, ResolveError, Resolver};
use crate::controller::{Action, ActionContext, ActionResult, Controller};
use crate::routing::UrlAttribute;
use crate::services::{Session, SessionStore, Templates};

pub struct Login {
    templates: Arc<Templates>,
    sessions: Arc<SessionStore>,
}

impl Injectable for Login {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            templates: resolver.resolve()?,
            sessions: resolver.resolve()?,
        })
    }
}

impl Controller for Login {
    const NAME: &'static str = "Login";

    fn actions() -> Vec<Action<Self>> {
        vec![
            Action::new("form", Self::form).route(UrlAttribute::with_verbs("/login", ["GET"])),
            Action::new("submit", Self::submit).route(UrlAttribute::with_verbs("/login", ["POST"])),
            Action::new("account", Self::account).route(UrlAttribute::new("/account")),
        ]
    }
}

impl Login {
    fn session(&self, cx: &ActionContext) -> Result<Session, &'static str> {
        let token = cx.session_token().ok_or("session cookie middleware is not installed")?;
        Ok(self.sessions.session(token))
    }

    async fn form(self: Arc<Self>, cx: ActionContext) -> ActionResult {
        let logged_in = self.session(&cx)?.has(LOGGED_IN);
        Ok(cx
            .reply()
            .render(&self.templates, "login.html", context! { logged_in })?)
    }

    async fn submit(self: Arc<Self>, cx: ActionContext) -> ActionResult {
        let username = cx.post_param("username").unwrap_or_default().trim().to_string();
        let session = self.session(&cx)?;

        let logged_in = !username.is_empty() && session.set(LOGGED_IN, "1") && session.set("username", &username);
        if logged_in {
            tracing::info!(username = %username, "User logged in");
        }

        Ok(cx.reply().render(
            &self.templates,
            "login_post.html",
            context! { username, logged_in },
        )?)
    }

    async fn account(self: Arc<Self>, cx: ActionContext) -> ActionResult {
        let session = self.session(&cx)?;
        if !session.has(LOGGED_IN) {
            return Ok(cx.redirect("/login"));
        }
        let username = session.get("username").unwrap_or_default();
        Ok(cx
            .reply()
            .render(&self.templates, "account.html", context! { username })?)
    }
}
