//! Demo application served by the `web-scaffold` binary.
//!
//! ```text
//! GET        /                      Index::index
//! GET        /helloworld[/{name}]   Index::hello      (name defaults to "World")
//! GET        /login                 Login::form
//! POST       /login                 Login::submit     (sets the `logged_in` flag)
//! GET        /account               Login::account    (redirects unless logged in)
//! GET        /whoops                WhoopsTest::whoops (always fails)
//! ```

pub mod index;
pub mod login;
pub mod whoops;

use crate::config::AppConfig;
use crate::controller::ControllerSet;
use crate::error::StartupError;
use crate::lifecycle::{Application, Bootstrap};
use crate::middleware::{AccessLog, MiddlewareSet, SessionCookie};

pub use index::Index;
pub use login::Login;
pub use whoops::WhoopsTest;

/// Session flag set by a successful login.
pub const LOGGED_IN: &str = "logged_in";

pub fn controllers() -> ControllerSet {
    ControllerSet::new()
        .add::<Index>()
        .add::<Login>()
        .add::<WhoopsTest>()
}

/// Access log outermost, so it also times the session middleware.
pub fn middleware() -> MiddlewareSet {
    MiddlewareSet::new().add::<AccessLog>().add::<SessionCookie>()
}

/// The demo application wired from `config`.
pub fn build(config: AppConfig) -> Result<Application, StartupError> {
    Bootstrap::new(config)
        .controllers(controllers())
        .middleware(middleware())
        .build()
}
