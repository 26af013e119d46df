//! Shared collaborators injected into controllers.
//!
//! Both are registered as container singletons: constructed on first
//! resolution, then shared by every request.

pub mod session;
pub mod templates;

pub use session::{Session, SessionStore, SessionToken};
pub use templates::{TemplateError, Templates};
