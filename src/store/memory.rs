//! In-memory implementation of DocumentStore.
//!
//! Collections are `tokio::sync::RwLock<HashMap<Uuid, _>>`. Used when
//! `storage.backend` is `memory` and by the test suites. Data does not
//! survive a restart.

use crate::store::error::StoreError;
use crate::store::models::*;
use crate::store::traits::DocumentStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory document store
#[derive(Default)]
pub struct MemoryStore {
    pub projects: RwLock<HashMap<Uuid, ProjectDoc>>,
    pub tasks: RwLock<HashMap<Uuid, TaskDoc>>,
    pub users: RwLock<HashMap<Uuid, UserDoc>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Builder / seeding methods
    // ========================================================================

    /// Seed a project into the store.
    pub async fn with_project(self, project: ProjectDoc) -> Self {
        self.projects.write().await.insert(project.id, project);
        self
    }

    /// Seed a task into the store. Project lists are not touched.
    pub async fn with_task(self, task: TaskDoc) -> Self {
        self.tasks.write().await.insert(task.id, task);
        self
    }
}

fn newest_first<T>(items: &mut [T], updated_at: impl Fn(&T) -> chrono::DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(updated_at(item)));
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    // ========================================================================
    // Users
    // ========================================================================

    async fn create_user(&self, user: &UserDoc) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail(user.email.clone()).into());
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserDoc>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    // ========================================================================
    // Projects
    // ========================================================================

    async fn create_project(&self, project: &ProjectDoc) -> Result<()> {
        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: Uuid, owner_id: Uuid) -> Result<Option<ProjectDoc>> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(&id)
            .filter(|p| p.owner_id == owner_id)
            .cloned())
    }

    async fn list_projects(&self, owner_id: Uuid) -> Result<Vec<ProjectDoc>> {
        let mut projects: Vec<ProjectDoc> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut projects, |p| p.updated_at);
        Ok(projects)
    }

    async fn update_project(&self, project: &ProjectDoc) -> Result<bool> {
        let mut projects = self.projects.write().await;
        match projects.get_mut(&project.id) {
            Some(existing) if existing.owner_id == project.owner_id => {
                existing.name = project.name.clone();
                existing.description = project.description.clone();
                existing.color = project.color.clone();
                existing.task_ids = project.task_ids.clone();
                existing.updated_at = project.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_project(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let mut projects = self.projects.write().await;
        if projects.get(&id).is_some_and(|p| p.owner_id == owner_id) {
            projects.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn push_task_to_project(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
        task_id: &str,
    ) -> Result<LinkOutcome> {
        let mut projects = self.projects.write().await;
        let Some(project) = projects
            .get_mut(&project_id)
            .filter(|p| p.owner_id == owner_id)
        else {
            return Ok(LinkOutcome::ProjectNotFound);
        };

        if project.task_ids.iter().any(|id| id == task_id) {
            return Ok(LinkOutcome::AlreadyLinked);
        }
        project.task_ids.push(task_id.to_string());
        project.updated_at = Utc::now();
        Ok(LinkOutcome::Linked)
    }

    async fn pull_task_from_project(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
        task_id: &str,
    ) -> Result<bool> {
        let mut projects = self.projects.write().await;
        let Some(project) = projects
            .get_mut(&project_id)
            .filter(|p| p.owner_id == owner_id)
        else {
            return Ok(false);
        };

        project.task_ids.retain(|id| id != task_id);
        project.updated_at = Utc::now();
        Ok(true)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    async fn create_task(&self, task: &TaskDoc) -> Result<()> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: Uuid, owner_id: Uuid) -> Result<Option<TaskDoc>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(&id).filter(|t| t.owner_id == owner_id).cloned())
    }

    async fn list_tasks(&self, owner_id: Uuid) -> Result<Vec<TaskDoc>> {
        let mut tasks: Vec<TaskDoc> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut tasks, |t| t.updated_at);
        Ok(tasks)
    }

    async fn update_task(&self, task: &TaskDoc) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(existing) if existing.owner_id == task.owner_id => {
                let created_at = existing.created_at;
                *existing = task.clone();
                existing.created_at = created_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_task(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        if tasks.get(&id).is_some_and(|t| t.owner_id == owner_id) {
            tasks.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn pull_project_from_tasks(&self, project_id: &str, owner_id: Uuid) -> Result<usize> {
        let now = Utc::now();
        let mut changed = 0;
        for task in self
            .tasks
            .write()
            .await
            .values_mut()
            .filter(|t| t.owner_id == owner_id)
        {
            if task.project_ids.iter().any(|id| id == project_id) {
                task.project_ids.retain(|id| id != project_id);
                task.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
