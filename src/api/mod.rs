//! HTTP API for the taskboard

pub mod auth_handlers;
pub mod handlers;
pub mod project_handlers;
pub mod query;
pub mod routes;
pub mod task_handlers;

pub use query::*;
pub use routes::create_router;
