//! Wire shapes and request DTOs for projects and tasks
//!
//! Shared by the HTTP handlers (server side) and the client stores, so every
//! type here is both `Serialize` and `Deserialize`. JSON keys are camelCase.

use super::patch::Patch;
use crate::store::models::{
    ProjectDoc, TaskDoc, TaskPriority, TaskStatus, DEFAULT_PROJECT_COLOR,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

// ============================================================================
// Wire shapes
// ============================================================================

/// A project as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    /// Ids of the tasks linked to this project
    pub tasks: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectDoc> for Project {
    fn from(doc: ProjectDoc) -> Self {
        Self {
            id: doc.id.to_string(),
            name: doc.name,
            description: doc.description,
            color: doc.color,
            tasks: doc.task_ids,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// A task as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    pub project_ids: Vec<String>,
    pub is_completed: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskDoc> for Task {
    fn from(doc: TaskDoc) -> Self {
        Self {
            id: doc.id.to_string(),
            title: doc.title,
            description: doc.description,
            status: doc.status,
            priority: doc.priority,
            due_date: doc.due_date,
            assignee: doc.assignee,
            project_ids: doc.project_ids,
            is_completed: doc.is_completed,
            tags: doc.tags,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

// ============================================================================
// Due dates
// ============================================================================

/// A due date accepted either as an RFC 3339 timestamp or as `YYYY-MM-DD`
/// (midnight UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDate(pub DateTime<Utc>);

impl DueDate {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Self(naive.and_utc()))
            .ok_or_else(|| format!("invalid dueDate '{}'", raw))
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let raw = String::deserialize(deserializer)?;
        DueDate::parse(&raw).map_err(D::Error::custom)
    }
}

impl Serialize for DueDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

// ============================================================================
// Project requests
// ============================================================================

/// Body of `POST /api/projects`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CreateProjectRequest {
    /// Validate and build a new project document for `owner_id`
    pub fn into_doc(self, owner_id: Uuid) -> Result<ProjectDoc, String> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| "Project name is required".to_string())?;

        let mut project = ProjectDoc::new(owner_id, name);
        project.description = self.description.unwrap_or_default();
        if let Some(color) = self.color.filter(|c| !c.is_empty()) {
            project.color = color;
        }
        Ok(project)
    }
}

/// Body of `PUT /api/projects/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub color: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub tasks: Patch<Vec<String>>,
}

impl UpdateProjectRequest {
    /// Apply the present fields to `project` and stamp `updated_at`
    pub fn apply(self, project: &mut ProjectDoc) -> Result<(), String> {
        if matches!(self.name, Patch::Null) {
            return Err("name cannot be null".to_string());
        }

        if let Patch::Set(name) = self.name {
            project.name = name;
        }
        if let Some(description) = self.description.into_option() {
            project.description = description.unwrap_or_default();
        }
        if let Some(color) = self.color.into_option() {
            project.color = color.unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string());
        }
        if let Some(tasks) = self.tasks.into_option() {
            project.task_ids = tasks.unwrap_or_default();
        }
        project.updated_at = Utc::now();
        Ok(())
    }
}

// ============================================================================
// Task requests
// ============================================================================

/// Body of `POST /api/tasks`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl CreateTaskRequest {
    /// Validate and build a new task document for `owner_id`
    pub fn into_doc(self, owner_id: Uuid) -> Result<TaskDoc, String> {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| "Task title is required".to_string())?;

        let mut task = TaskDoc::new(owner_id, title);
        task.description = self.description.unwrap_or_default();
        task.status = self.status.unwrap_or_default();
        task.priority = self.priority.unwrap_or_default();
        task.due_date = self.due_date.map(|d| d.0);
        task.assignee = self.assignee.filter(|a| !a.is_empty());
        task.project_ids = self.project_ids.unwrap_or_default();
        task.tags = self.tags.unwrap_or_default();
        Ok(task)
    }
}

/// Body of `PUT /api/tasks/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub status: Patch<TaskStatus>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub priority: Patch<TaskPriority>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub due_date: Patch<DueDate>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub assignee: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub project_ids: Patch<Vec<String>>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub is_completed: Patch<bool>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub tags: Patch<Vec<String>>,
}

impl UpdateTaskRequest {
    /// Whether this update touches project membership
    pub fn changes_projects(&self) -> bool {
        self.project_ids.is_present()
    }

    /// Apply the present fields to `task` and stamp `updated_at`
    pub fn apply(self, task: &mut TaskDoc) -> Result<(), String> {
        let not_nullable = [
            ("title", matches!(self.title, Patch::Null)),
            ("status", matches!(self.status, Patch::Null)),
            ("priority", matches!(self.priority, Patch::Null)),
            ("isCompleted", matches!(self.is_completed, Patch::Null)),
        ];
        if let Some((field, _)) = not_nullable.iter().find(|(_, is_null)| *is_null) {
            return Err(format!("{} cannot be null", field));
        }

        if let Patch::Set(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description.into_option() {
            task.description = description.unwrap_or_default();
        }
        if let Patch::Set(status) = self.status {
            task.status = status;
        }
        if let Patch::Set(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date.into_option() {
            task.due_date = due_date.map(|d| d.0);
        }
        if let Some(assignee) = self.assignee.into_option() {
            task.assignee = assignee;
        }
        if let Some(project_ids) = self.project_ids.into_option() {
            task.project_ids = project_ids.unwrap_or_default();
        }
        if let Patch::Set(is_completed) = self.is_completed {
            task.is_completed = is_completed;
        }
        if let Some(tags) = self.tags.into_option() {
            task.tags = tags.unwrap_or_default();
        }
        task.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_project_defaults() {
        let owner = Uuid::new_v4();
        let req: CreateProjectRequest = serde_json::from_str(r#"{"name":"Launch"}"#).unwrap();
        let project = req.into_doc(owner).unwrap();
        assert_eq!(project.name, "Launch");
        assert_eq!(project.description, "");
        assert_eq!(project.color, "blue");
        assert!(project.task_ids.is_empty());
        assert_eq!(project.owner_id, owner);
    }

    #[test]
    fn test_create_project_requires_name() {
        for body in [r#"{}"#, r#"{"name":""}"#, r#"{"name":"   "}"#, r#"{"name":null}"#] {
            let req: CreateProjectRequest = serde_json::from_str(body).unwrap();
            assert_eq!(
                req.into_doc(Uuid::new_v4()).unwrap_err(),
                "Project name is required",
                "body: {}",
                body
            );
        }
    }

    #[test]
    fn test_create_task_defaults() {
        let req: CreateTaskRequest =
            serde_json::from_str(r#"{"title":"X","projectIds":["P1"]}"#).unwrap();
        let task = req.into_doc(Uuid::new_v4()).unwrap();
        assert_eq!(task.title, "X");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.project_ids, vec!["P1".to_string()]);
        assert!(task.tags.is_empty());
        assert!(!task.is_completed);
        assert!(task.assignee.is_none());
    }

    #[test]
    fn test_create_task_requires_title() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"description":"d"}"#).unwrap();
        assert_eq!(
            req.into_doc(Uuid::new_v4()).unwrap_err(),
            "Task title is required"
        );
    }

    #[test]
    fn test_due_date_accepts_plain_dates() {
        let req: CreateTaskRequest =
            serde_json::from_str(r#"{"title":"X","dueDate":"2025-03-01"}"#).unwrap();
        let task = req.into_doc(Uuid::new_v4()).unwrap();
        assert_eq!(
            task.due_date.unwrap().to_rfc3339(),
            "2025-03-01T00:00:00+00:00"
        );

        let req: CreateTaskRequest =
            serde_json::from_str(r#"{"title":"X","dueDate":"2025-03-01T12:30:00+02:00"}"#)
                .unwrap();
        let task = req.into_doc(Uuid::new_v4()).unwrap();
        assert_eq!(
            task.due_date.unwrap().to_rfc3339(),
            "2025-03-01T10:30:00+00:00"
        );

        assert!(serde_json::from_str::<CreateTaskRequest>(r#"{"dueDate":"soon"}"#).is_err());
    }

    #[test]
    fn test_update_task_leaves_absent_fields() {
        let mut task = TaskDoc::new(Uuid::new_v4(), "Original".to_string());
        task.assignee = Some("kim".to_string());
        task.tags = vec!["a".to_string()];
        let before = task.updated_at;

        let req: UpdateTaskRequest = serde_json::from_str(r#"{"status":"review"}"#).unwrap();
        assert!(!req.changes_projects());
        req.apply(&mut task).unwrap();

        assert_eq!(task.status, TaskStatus::Review);
        assert_eq!(task.title, "Original");
        assert_eq!(task.assignee.as_deref(), Some("kim"));
        assert_eq!(task.tags, vec!["a".to_string()]);
        assert!(task.updated_at >= before);
    }

    #[test]
    fn test_update_task_null_overwrites() {
        let mut task = TaskDoc::new(Uuid::new_v4(), "T".to_string());
        task.description = "long".to_string();
        task.assignee = Some("kim".to_string());
        task.project_ids = vec!["p".to_string()];
        task.due_date = Some(Utc::now());

        let req: UpdateTaskRequest = serde_json::from_str(
            r#"{"description":null,"assignee":null,"projectIds":null,"dueDate":null,"tags":[]}"#,
        )
        .unwrap();
        assert!(req.changes_projects());
        req.apply(&mut task).unwrap();

        assert_eq!(task.description, "");
        assert!(task.assignee.is_none());
        assert!(task.project_ids.is_empty());
        assert!(task.due_date.is_none());
        assert!(task.tags.is_empty());
    }

    #[test]
    fn test_update_task_rejects_null_title() {
        let mut task = TaskDoc::new(Uuid::new_v4(), "T".to_string());
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title":null}"#).unwrap();
        assert_eq!(req.apply(&mut task).unwrap_err(), "title cannot be null");
        assert_eq!(task.title, "T");
    }

    #[test]
    fn test_update_task_empty_title_overwrites() {
        let mut task = TaskDoc::new(Uuid::new_v4(), "T".to_string());
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title":""}"#).unwrap();
        req.apply(&mut task).unwrap();
        assert_eq!(task.title, "");
    }

    #[test]
    fn test_update_project_null_color_resets_default() {
        let mut project = ProjectDoc::new(Uuid::new_v4(), "P".to_string());
        project.color = "red".to_string();
        let req: UpdateProjectRequest =
            serde_json::from_str(r#"{"color":null,"tasks":["t1"]}"#).unwrap();
        req.apply(&mut project).unwrap();
        assert_eq!(project.color, "blue");
        assert_eq!(project.task_ids, vec!["t1".to_string()]);
        assert_eq!(project.name, "P");
    }

    #[test]
    fn test_wire_shape_uses_camel_case_id() {
        let doc = TaskDoc::new(Uuid::new_v4(), "T".to_string());
        let id = doc.id.to_string();
        let value = serde_json::to_value(Task::from(doc)).unwrap();
        assert_eq!(value["id"], id);
        assert!(value.get("projectIds").is_some());
        assert!(value.get("isCompleted").is_some());
        assert!(value["dueDate"].is_null());
        assert!(value.get("owner_id").is_none());
        assert!(value.get("ownerId").is_none());
    }

    #[test]
    fn test_update_request_serializes_only_present_fields() {
        let req = UpdateTaskRequest {
            status: Patch::Set(TaskStatus::Done),
            is_completed: Patch::Set(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"status":"done","isCompleted":true}"#
        );
    }
}
