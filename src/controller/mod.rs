//! Controllers and their actions.
//!
//! # Responsibilities
//! - Declare which routes each controller action serves
//! - Erase typed actions into handlers the dispatch table can store
//! - Build a fresh controller from the container for every call
//!
//! # Data Flow
//! ```text
//! ControllerSet::add::<C>()
//!     → C::actions()             (name, url attributes, handler)
//!     → routing::discover        (RouteDescriptor per attribute)
//!     → RouteTable               (descriptor + Arc<dyn ActionHandler>)
//!
//! dispatch:
//!     ActionHandler::invoke(container, cx)
//!         → container.resolve::<C>()   fresh instance, shared singletons
//!         → action(controller, cx).await
//! ```

pub mod context;
pub mod reply;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::container::{Container, Injectable, ResolveError};
use crate::error::BoxError;
use crate::routing::UrlAttribute;

pub use context::{ActionContext, UploadedFile};
pub use reply::Reply;

/// What an action returns.
pub type ActionResult = Result<Response, BoxError>;

type ActionFn<C> = Arc<dyn Fn(Arc<C>, ActionContext) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// A type whose actions serve routes.
///
/// ```ignore
/// impl Controller for Index {
///     const NAME: &'static str = "Index";
///
///     fn actions() -> Vec<Action<Self>> {
///         vec![Action::new("index", Self::index).route(UrlAttribute::new("/"))]
///     }
/// }
/// ```
pub trait Controller: Injectable {
    const NAME: &'static str;

    fn actions() -> Vec<Action<Self>>;
}

/// One controller method plus the url attributes attached to it.
pub struct Action<C> {
    name: &'static str,
    routes: Vec<UrlAttribute>,
    handler: ActionFn<C>,
}

impl<C: Controller> Action<C> {
    pub fn new<F, Fut>(name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<C>, ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        Self {
            name,
            routes: Vec::new(),
            handler: Arc::new(move |controller: Arc<C>, cx: ActionContext| {
                handler(controller, cx).boxed()
            }),
        }
    }

    /// Attach a url attribute. May be called repeatedly.
    pub fn route(mut self, attribute: UrlAttribute) -> Self {
        self.routes.push(attribute);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn routes(&self) -> &[UrlAttribute] {
        &self.routes
    }
}

/// Type-erased action stored in the dispatch table.
pub trait ActionHandler: Send + Sync {
    /// Resolve a fresh controller and start the action.
    fn invoke(
        &self,
        container: &Container,
        cx: ActionContext,
    ) -> Result<BoxFuture<'static, ActionResult>, ResolveError>;
}

struct BoundAction<C> {
    handler: ActionFn<C>,
}

impl<C: Controller> ActionHandler for BoundAction<C> {
    fn invoke(
        &self,
        container: &Container,
        cx: ActionContext,
    ) -> Result<BoxFuture<'static, ActionResult>, ResolveError> {
        let controller = container.resolve::<C>()?;
        Ok((self.handler)(controller, cx))
    }
}

/// An action with its attributes and erased handler, as seen by discovery.
pub struct DiscoveredAction {
    pub name: &'static str,
    pub routes: Vec<UrlAttribute>,
    pub handler: Arc<dyn ActionHandler>,
}

struct ControllerEntry {
    name: &'static str,
    describe: fn() -> Vec<DiscoveredAction>,
    bind: fn(&mut Container),
}

/// The set of controllers an application serves.
#[derive(Default)]
pub struct ControllerSet {
    entries: Vec<ControllerEntry>,
}

impl ControllerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register controller `C`. Order of registration is route order.
    pub fn add<C: Controller>(mut self) -> Self {
        self.entries.push(ControllerEntry {
            name: C::NAME,
            describe: describe::<C>,
            bind: bind::<C>,
        });
        self
    }

    /// Controller names with their actions, in registration order.
    pub fn describe(&self) -> impl Iterator<Item = (&'static str, Vec<DiscoveredAction>)> + '_ {
        self.entries.iter().map(|entry| (entry.name, (entry.describe)()))
    }

    /// Bind every controller not already bound, as a transient autowire.
    pub fn bind_all(&self, container: &mut Container) {
        for entry in &self.entries {
            (entry.bind)(container);
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ControllerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn describe<C: Controller>() -> Vec<DiscoveredAction> {
    C::actions()
        .into_iter()
        .map(|action| DiscoveredAction {
            name: action.name,
            routes: action.routes,
            handler: Arc::new(BoundAction {
                handler: action.handler,
            }),
        })
        .collect()
}

fn bind<C: Controller>(container: &mut Container) {
    if !container.contains::<C>() {
        container.autowire::<C>();
    }
}
