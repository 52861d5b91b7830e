//! Task API handlers
//!
//! The task document is always written first. Project task lists are then
//! brought in line by the reference synchronizer, which never fails the
//! request.

use crate::auth::extractor::AuthUser;
use crate::board::{CreateTaskRequest, Task, UpdateTaskRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::handlers::{parse_id, ApiJson, AppError, SuccessResponse, TaskboardState};
use super::query::TaskListQuery;

/// GET /api/tasks - caller's tasks, most recently updated first
pub async fn list_tasks(
    State(state): State<TaskboardState>,
    user: AuthUser,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let filter = query.parse().map_err(AppError::BadRequest)?;
    let tasks = state.store.list_tasks(user.user_id).await?;

    Ok(Json(
        tasks
            .into_iter()
            .filter(|t| filter.matches(t))
            .map(Task::from)
            .collect(),
    ))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<TaskboardState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let id = parse_id(&id, "Task")?;
    let task = state
        .store
        .get_task(id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    Ok(Json(Task::from(task)))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<TaskboardState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = req.into_doc(user.user_id).map_err(AppError::BadRequest)?;
    state.store.create_task(&task).await?;

    state.references.link_new_task(&task).await;

    tracing::debug!(task_id = %task.id, owner = %user.user_id, "Created task");
    Ok((StatusCode::CREATED, Json(Task::from(task))))
}

/// PUT /api/tasks/{id} - partial update
pub async fn update_task(
    State(state): State<TaskboardState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let id = parse_id(&id, "Task")?;
    let mut task = state
        .store
        .get_task(id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    let before = task.project_ids.clone();
    let changes_projects = req.changes_projects();
    req.apply(&mut task).map_err(AppError::BadRequest)?;

    if !state.store.update_task(&task).await? {
        return Err(AppError::NotFound("Task not found".to_string()));
    }

    if changes_projects {
        state.references.reconcile(&task, &before).await;
    }
    Ok(Json(Task::from(task)))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(state): State<TaskboardState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let id = parse_id(&id, "Task")?;
    let task = state
        .store
        .get_task(id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    state.references.unlink_deleted_task(&task).await;

    if !state.store.delete_task(id, user.user_id).await? {
        return Err(AppError::NotFound("Task not found".to_string()));
    }

    tracing::debug!(task_id = %id, owner = %user.user_id, "Deleted task");
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================================
// Tests
// ============================================================================
