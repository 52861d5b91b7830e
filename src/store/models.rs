//! Stored document shapes for projects, tasks and users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Color given to projects created without one
pub const DEFAULT_PROJECT_COLOR: &str = "blue";

// ============================================================================
// Project
// ============================================================================

/// A project document, partitioned by owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDoc {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub color: String,
    /// Denormalized ids of the tasks linked to this project, in link order
    pub task_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectDoc {
    /// Create a project with default description/color and no tasks
    pub fn new(owner_id: Uuid, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            description: String::new(),
            color: DEFAULT_PROJECT_COLOR.to_string(),
            task_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Task
// ============================================================================

/// Workflow status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    #[serde(alias = "in-progress")]
    InProgress,
    Review,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "todo" => Ok(Self::Todo),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// Priority of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(format!("unknown task priority '{}'", other)),
        }
    }
}

/// A task document, partitioned by owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDoc {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    /// Denormalized project ids as supplied by the caller (may not resolve)
    pub project_ids: Vec<String>,
    pub is_completed: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskDoc {
    /// Create a task with default status/priority and no links
    pub fn new(owner_id: Uuid, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title,
            description: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date: None,
            assignee: None,
            project_ids: Vec::new(),
            is_completed: false,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// User
// ============================================================================

/// A registered account. `password_hash` is a bcrypt hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDoc {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of appending a task id to a project's task list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The id was appended
    Linked,
    /// The id was already present; nothing changed
    AlreadyLinked,
    /// No project with that id for that owner
    ProjectNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        let parsed: TaskStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(parsed, TaskStatus::InProgress);
        assert!(serde_json::from_str::<TaskStatus>("\"blocked\"").is_err());
    }

    #[test]
    fn test_status_from_str_matches_display() {
        for status in [
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::Review,
            TaskStatus::Done,
        ] {
            assert_eq!(status.to_string().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_parsing() {
        assert_eq!("urgent".parse::<TaskPriority>().unwrap(), TaskPriority::Urgent);
        assert_eq!(
            serde_json::from_str::<TaskPriority>("\"low\"").unwrap(),
            TaskPriority::Low
        );
        assert!("critical".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_new_documents_use_defaults() {
        let owner = Uuid::new_v4();
        let project = ProjectDoc::new(owner, "Website".to_string());
        assert_eq!(project.color, DEFAULT_PROJECT_COLOR);
        assert!(project.task_ids.is_empty());
        assert_eq!(project.created_at, project.updated_at);

        let task = TaskDoc::new(owner, "Write copy".to_string());
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(!task.is_completed);
        assert!(task.due_date.is_none());
    }
}
