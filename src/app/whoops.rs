use std::sync::Arc;

use crate::container::{Injectable, ResolveError, Resolver};
use crate::controller::{Action, ActionContext, ActionResult, Controller};
use crate::routing::UrlAttribute;

/// Always fails; exercises the error boundary.
pub struct WhoopsTest;

impl Injectable for WhoopsTest {
    fn inject(_: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(WhoopsTest)
    }
}

impl Controller for WhoopsTest {
    const NAME: &'static str = "WhoopsTest";

    fn actions() -> Vec<Action<Self>> {
        vec![Action::new("whoops", Self::whoops).route(UrlAttribute::new("/whoops"))]
    }
}

impl WhoopsTest {
    async fn whoops(self: Arc<Self>, _cx: ActionContext) -> ActionResult {
        Err("whoops, i made a boo boo".into())
    }
}
