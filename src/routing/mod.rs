//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     ControllerSet
//!     → discovery.rs (read each action's UrlAttribute list)
//!     → descriptor.rs (validate verbs, compile pattern.rs)
//!     → router.rs (freeze as immutable RouteTable)
//!
//! Incoming Request (verb, path)
//!     → router.rs (scan in registration order)
//!     → pattern.rs (segment match, capture optional param)
//!     → Found | MethodNotAllowed | NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: first registered match wins
//! - Invalid metadata is a startup error, never a request-time one

pub mod descriptor;
pub mod discovery;
pub mod pattern;
pub mod router;
pub mod verb;

use thiserror::Error;

pub use descriptor::{RouteDescriptor, UrlAttribute};
pub use discovery::discover;
pub use pattern::{PathParams, PathPattern};
pub use router::{Lookup, Route, RouteMatch, RouteTable};
pub use verb::{Verb, VerbSet};

/// Errors raised while compiling routing metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A verb token outside the canonical set.
    #[error("invalid verb `{token}`, expected one of: {valid}")]
    InvalidVerb { token: String, valid: String },

    /// A route declared with an empty verb list.
    #[error("a route must declare at least one verb")]
    NoVerbs,

    /// Pattern outside the supported syntax.
    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A default declared for a name the pattern does not capture.
    #[error("pattern `{pattern}` has no optional capture named `{name}`")]
    UnknownDefault { pattern: String, name: String },
}
