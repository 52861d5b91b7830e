//! API route definitions

use super::auth_handlers;
use super::handlers::{self, TaskboardState};
use super::project_handlers;
use super::task_handlers;
use crate::auth::middleware::require_auth;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: TaskboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        // Health check
        .route("/health", get(handlers::health))
        .route("/api/auth/signup", post(auth_handlers::signup))
        .route("/api/auth/login", post(auth_handlers::login))
        .route("/api/auth/demo", post(auth_handlers::demo_login));

    let protected = Router::new()
        .route("/api/auth/me", get(auth_handlers::get_me))
        .route("/api/auth/refresh", post(auth_handlers::refresh_token))
        // ====================================================================
        // Projects
        // ====================================================================
        .route(
            "/api/projects",
            get(project_handlers::list_projects).post(project_handlers::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(project_handlers::get_project)
                .put(project_handlers::update_project)
                .delete(project_handlers::delete_project),
        )
        // ====================================================================
        // Tasks
        // ====================================================================
        .route(
            "/api/tasks",
            get(task_handlers::list_tasks).post(task_handlers::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(task_handlers::get_task)
                .put(task_handlers::update_task)
                .delete(task_handlers::delete_task),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
