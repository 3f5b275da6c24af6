//! API Module
//!
//! HTTP handlers and routing for the cache admin surface. The surface
//! exposes the cache API and the invalidation layer; it carries no
//! listing business endpoints.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
