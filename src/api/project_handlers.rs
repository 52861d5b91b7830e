//! Project API handlers
//!
//! Every operation is scoped to the caller: a project owned by someone else
//! is indistinguishable from a missing one (404).

use crate::auth::extractor::AuthUser;
use crate::board::{CreateProjectRequest, Project, UpdateProjectRequest};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::handlers::{parse_id, ApiJson, AppError, SuccessResponse, TaskboardState};

/// GET /api/projects - caller's projects, most recently updated first
pub async fn list_projects(
    State(state): State<TaskboardState>,
    user: AuthUser,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = state.store.list_projects(user.user_id).await?;
    Ok(Json(projects.into_iter().map(Project::from).collect()))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<TaskboardState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Project>, AppError> {
    let id = parse_id(&id, "Project")?;
    let project = state
        .store
        .get_project(id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(Project::from(project)))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<TaskboardState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let project = req.into_doc(user.user_id).map_err(AppError::BadRequest)?;
    state.store.create_project(&project).await?;

    tracing::debug!(project_id = %project.id, owner = %user.user_id, "Created project");
    Ok((StatusCode::CREATED, Json(Project::from(project))))
}

/// PUT /api/projects/{id} - partial update
pub async fn update_project(
    State(state): State<TaskboardState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let id = parse_id(&id, "Project")?;
    let mut project = state
        .store
        .get_project(id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    req.apply(&mut project).map_err(AppError::BadRequest)?;

    if !state.store.update_project(&project).await? {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    Ok(Json(Project::from(project)))
}

/// DELETE /api/projects/{id}
///
/// Tasks keep listing the deleted id unless `references.cascade_project_delete`
/// is enabled.
pub async fn delete_project(
    State(state): State<TaskboardState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let id = parse_id(&id, "Project")?;
    if !state.store.delete_project(id, user.user_id).await? {
        return Err(AppError::NotFound("Project not found".to_string()));
    }

    if state.cascade_project_delete {
        state
            .references
            .unlink_deleted_project(id, user.user_id)
            .await;
    }

    tracing::debug!(project_id = %id, owner = %user.user_id, "Deleted project");
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================================
// Tests
// ============================================================================
