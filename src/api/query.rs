//! Query parameters for the task list endpoint

use crate::store::models::{TaskDoc, TaskPriority, TaskStatus};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `GET /api/tasks` query string
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    /// Comma-separated status values, e.g. "todo,in_progress"
    pub status: Option<String>,
    /// Comma-separated priority values, e.g. "high,urgent"
    pub priority: Option<String>,
    /// Only tasks listing this project id
    pub project_id: Option<String>,
    /// Only tasks carrying this tag
    pub tag: Option<String>,
}

/// Parsed form of [`TaskListQuery`]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskFilter {
    pub statuses: Option<Vec<TaskStatus>>,
    pub priorities: Option<Vec<TaskPriority>>,
    pub project_id: Option<String>,
    pub tag: Option<String>,
}

/// Split a comma-separated value, dropping empty entries
fn split_csv(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_csv<T: FromStr<Err = String>>(raw: Option<&String>) -> Result<Option<Vec<T>>, String> {
    match raw {
        None => Ok(None),
        Some(raw) => {
            let values = split_csv(raw)
                .map(T::from_str)
                .collect::<Result<Vec<T>, String>>()?;
            Ok((!values.is_empty()).then_some(values))
        }
    }
}

impl TaskListQuery {
    /// Validate and parse the query string
    pub fn parse(&self) -> Result<TaskFilter, String> {
        Ok(TaskFilter {
            statuses: parse_csv(self.status.as_ref())?,
            priorities: parse_csv(self.priority.as_ref())?,
            project_id: self.project_id.clone().filter(|p| !p.is_empty()),
            tag: self.tag.clone().filter(|t| !t.is_empty()),
        })
    }
}

impl TaskFilter {
    pub fn matches(&self, task: &TaskDoc) -> bool {
        if let Some(ref statuses) = self.statuses {
            if !statuses.contains(&task.status) {
                return false;
            }
        }
        if let Some(ref priorities) = self.priorities {
            if !priorities.contains(&task.priority) {
                return false;
            }
        }
        if let Some(ref project_id) = self.project_id {
            if !task.project_ids.iter().any(|id| id == project_id) {
                return false;
            }
        }
        if let Some(ref tag) = self.tag {
            if !task.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parse_comma_separated() {
        let query = TaskListQuery {
            status: Some("todo, in-progress,,".to_string()),
            priority: Some("high".to_string()),
            ..Default::default()
        };
        let filter = query.parse().unwrap();
        assert_eq!(
            filter.statuses,
            Some(vec![TaskStatus::Todo, TaskStatus::InProgress])
        );
        assert_eq!(filter.priorities, Some(vec![TaskPriority::High]));
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        let query = TaskListQuery {
            status: Some("todo,blocked".to_string()),
            ..Default::default()
        };
        assert_eq!(query.parse().unwrap_err(), "unknown task status 'blocked'");
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let filter = TaskListQuery::default().parse().unwrap();
        assert_eq!(filter, TaskFilter::default());
        assert!(filter.matches(&TaskDoc::new(Uuid::new_v4(), "T".to_string())));
    }

    #[test]
    fn test_matches_project_and_tag() {
        let mut task = TaskDoc::new(Uuid::new_v4(), "T".to_string());
        task.project_ids = vec!["p1".to_string()];
        task.tags = vec!["ops".to_string()];

        let hit = TaskListQuery {
            project_id: Some("p1".to_string()),
            tag: Some("ops".to_string()),
            ..Default::default()
        };
        assert!(hit.parse().unwrap().matches(&task));

        let miss = TaskListQuery {
            project_id: Some("p2".to_string()),
            ..Default::default()
        };
        assert!(!miss.parse().unwrap().matches(&task));
    }
}
