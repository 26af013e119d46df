//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum + tower-http layers: request ID, trace, timeout)
//!     → Application::handle (error boundary + middleware chain)
//!     → dispatch.rs (route lookup, controller invocation)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod server;

pub use dispatch::Dispatcher;
pub use server::HttpServer;
