//! DocumentStore trait definition
//!
//! Abstract interface over the three collections (projects, tasks, users).
//! Implemented by `Neo4jStore` for deployments and `MemoryStore` for local
//! runs and tests.

use crate::store::models::*;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Collection-level operations used by the handlers and the reference
/// synchronizer.
///
/// Every project/task read is scoped by `owner_id`; a document owned by
/// someone else is indistinguishable from a missing one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name reported by the health endpoint
    fn backend_name(&self) -> &'static str;

    /// Check connectivity to the backend
    async fn health_check(&self) -> Result<bool>;

    // ========================================================================
    // User operations
    // ========================================================================

    /// Insert a new user.
    ///
    /// Fails with [`StoreError::DuplicateEmail`](crate::store::StoreError)
    /// when the email is taken, atomically with the insert.
    async fn create_user(&self, user: &UserDoc) -> Result<()>;

    /// Get a user by email (exact match)
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDoc>>;

    /// Get a user by ID
    async fn get_user(&self, id: Uuid) -> Result<Option<UserDoc>>;

    // ========================================================================
    // Project operations
    // ========================================================================

    /// Insert a new project
    async fn create_project(&self, project: &ProjectDoc) -> Result<()>;

    /// Get a project by ID for an owner
    async fn get_project(&self, id: Uuid, owner_id: Uuid) -> Result<Option<ProjectDoc>>;

    /// List an owner's projects, most recently updated first
    async fn list_projects(&self, owner_id: Uuid) -> Result<Vec<ProjectDoc>>;

    /// Overwrite the mutable fields of an existing project.
    ///
    /// Returns false when no project matches `(id, owner_id)`.
    async fn update_project(&self, project: &ProjectDoc) -> Result<bool>;

    /// Delete a project. Returns false when nothing matched.
    async fn delete_project(&self, id: Uuid, owner_id: Uuid) -> Result<bool>;

    /// Append `task_id` to a project's task list unless already present,
    /// stamping `updated_at` when the list changes.
    async fn push_task_to_project(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
        task_id: &str,
    ) -> Result<LinkOutcome>;

    /// Remove every occurrence of `task_id` from a project's task list and
    /// stamp `updated_at`. Returns false when no project matched.
    async fn pull_task_from_project(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
        task_id: &str,
    ) -> Result<bool>;

    // ========================================================================
    // Task operations
    // ========================================================================

    /// Insert a new task
    async fn create_task(&self, task: &TaskDoc) -> Result<()>;

    /// Get a task by ID for an owner
    async fn get_task(&self, id: Uuid, owner_id: Uuid) -> Result<Option<TaskDoc>>;

    /// List an owner's tasks, most recently updated first
    async fn list_tasks(&self, owner_id: Uuid) -> Result<Vec<TaskDoc>>;

    /// Overwrite the mutable fields of an existing task.
    ///
    /// Returns false when no task matches `(id, owner_id)`.
    async fn update_task(&self, task: &TaskDoc) -> Result<bool>;

    /// Delete a task. Returns false when nothing matched.
    async fn delete_task(&self, id: Uuid, owner_id: Uuid) -> Result<bool>;

    /// Remove `project_id` from the `project_ids` of every task of the owner.
    /// Returns the number of tasks changed.
    async fn pull_project_from_tasks(&self, project_id: &str, owner_id: Uuid) -> Result<usize>;
}
