//! Route discovery.
//!
//! Walks every registered controller, reads the url attributes of each
//! action and compiles them into routes. Pure: running it twice over the
//! same set yields the same routes in the same order.

use std::sync::Arc;

use crate::controller::{ActionHandler, ControllerSet};
use crate::error::StartupError;
use crate::routing::descriptor::RouteDescriptor;
use crate::routing::router::Route;

/// Compile the routes of every controller in `controllers`.
///
/// Actions without url attributes are skipped. The first invalid attribute
/// aborts discovery with the offending controller and action named.
pub fn discover(
    controllers: &ControllerSet,
) -> Result<Vec<Route<Arc<dyn ActionHandler>>>, StartupError> {
    let mut routes: Vec<Route<Arc<dyn ActionHandler>>> = Vec::new();

    for (controller, actions) in controllers.describe() {
        for action in actions {
            if action.routes.is_empty() {
                tracing::debug!(controller, action = action.name, "Action has no routes");
                continue;
            }

            for attribute in &action.routes {
                let descriptor = RouteDescriptor::new(attribute, controller, action.name)
                    .map_err(|source| StartupError::Route {
                        controller,
                        action: action.name,
                        source,
                    })?;

                if let Some(earlier) = routes.iter().find(|r| shadows(&r.descriptor, &descriptor)) {
                    tracing::warn!(
                        pattern = %descriptor.pattern(),
                        shadowed = %descriptor.target(),
                        by = %earlier.descriptor.target(),
                        "Route is shadowed by an earlier registration"
                    );
                }

                routes.push(Route {
                    descriptor,
                    handler: Arc::clone(&action.handler),
                });
            }
        }
    }

    tracing::info!(
        controllers = controllers.len(),
        routes = routes.len(),
        "Route discovery complete"
    );
    Ok(routes)
}

/// Same pattern and every verb of `later` already served by `earlier`.
fn shadows(earlier: &RouteDescriptor, later: &RouteDescriptor) -> bool {
    earlier.pattern().as_str() == later.pattern().as_str()
        && later.verbs().iter().all(|v| earlier.verbs().contains(v))
}
