//! Client-side task cache

use super::{remove_entry, replace_entry, ApiClient, ClientResult, StoreState};
use crate::api::TaskListQuery;
use crate::board::{CreateTaskRequest, Patch, Task, UpdateTaskRequest};
use crate::store::TaskStatus;
use tokio::sync::RwLock;

pub struct TaskStore {
    api: ApiClient,
    state: RwLock<StoreState<Task>>,
}

impl TaskStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Copy of the current cache and status
    pub async fn snapshot(&self) -> StoreState<Task> {
        self.state.read().await.clone()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.items.clone()
    }

    /// Replace the cache with the server's (optionally filtered) list
    pub async fn fetch_tasks(&self, query: &TaskListQuery) -> ClientResult<Vec<Task>> {
        self.state.write().await.begin();
        let result = self.api.list_tasks(query).await;
        self.state
            .write()
            .await
            .settle(result, |items, fetched| *items = fetched.clone())
    }

    pub async fn add_task(&self, req: &CreateTaskRequest) -> ClientResult<Task> {
        self.state.write().await.begin();
        let result = self.api.create_task(req).await;
        self.state
            .write()
            .await
            .settle(result, |items, created| items.push(created.clone()))
    }

    pub async fn update_task(&self, id: &str, req: &UpdateTaskRequest) -> ClientResult<Task> {
        self.state.write().await.begin();
        let result = self.api.update_task(id, req).await;
        self.state
            .write()
            .await
            .settle(result, |items, fresh| replace_entry(items, fresh))
    }

    pub async fn delete_task(&self, id: &str) -> ClientResult<()> {
        self.state.write().await.begin();
        let result = self.api.delete_task(id).await;
        self.state
            .write()
            .await
            .settle(result, |items, _| remove_entry(items, id))
    }

    pub async fn set_task_status(&self, id: &str, status: TaskStatus) -> ClientResult<Task> {
        let req = UpdateTaskRequest {
            status: Patch::Set(status),
            ..Default::default()
        };
        self.update_task(id, &req).await
    }

    /// Mark a task complete (status `done`) or reopen it (status `todo`)
    pub async fn set_task_complete(&self, id: &str, is_completed: bool) -> ClientResult<Task> {
        let status = if is_completed {
            TaskStatus::Done
        } else {
            TaskStatus::Todo
        };
        let req = UpdateTaskRequest {
            is_completed: Patch::Set(is_completed),
            status: Patch::Set(status),
            ..Default::default()
        };
        self.update_task(id, &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn task_json(id: &str, status: &str, done: bool) -> Value {
        json!({
            "id": id,
            "title": "Write report",
            "description": "",
            "status": status,
            "priority": "medium",
            "dueDate": null,
            "assignee": null,
            "projectIds": [],
            "isCompleted": done,
            "tags": [],
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z"
        })
    }

    async fn store_with_tasks(server: &MockServer, tasks: Value) -> TaskStore {
        Mock::given(method("GET"))
            .and(path("/api/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tasks))
            .mount(server)
            .await;
        let store = TaskStore::new(ApiClient::new(&server.uri()).unwrap().with_token("t"));
        store.fetch_tasks(&TaskListQuery::default()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_add_task_appends() {
        let server = MockServer::start().await;
        let store = store_with_tasks(&server, json!([task_json("t1", "todo", false)])).await;
        Mock::given(method("POST"))
            .and(path("/api/tasks"))
            .and(body_partial_json(json!({"title": "Write report", "projectIds": ["p1"]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(task_json("t2", "todo", false)))
            .mount(&server)
            .await;

        let req = CreateTaskRequest {
            title: Some("Write report".to_string()),
            project_ids: Some(vec!["p1".to_string()]),
            ..Default::default()
        };
        store.add_task(&req).await.unwrap();

        let ids: Vec<String> = store.tasks().await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_set_task_status_sends_only_status() {
        let server = MockServer::start().await;
        let store = store_with_tasks(&server, json!([task_json("t1", "todo", false)])).await;
        Mock::given(method("PUT"))
            .and(path("/api/tasks/t1"))
            .and(body_json(json!({"status": "review"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json("t1", "review", false)))
            .expect(1)
            .mount(&server)
            .await;

        let task = store.set_task_status("t1", TaskStatus::Review).await.unwrap();
        assert_eq!(task.status, TaskStatus::Review);
        assert_eq!(store.tasks().await[0].status, TaskStatus::Review);
    }

    #[tokio::test]
    async fn test_set_task_complete_toggles_status() {
        let server = MockServer::start().await;
        let store = store_with_tasks(&server, json!([task_json("t1", "in_progress", false)])).await;
        Mock::given(method("PUT"))
            .and(path("/api/tasks/t1"))
            .and(body_json(json!({"status": "done", "isCompleted": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json("t1", "done", true)))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/tasks/t1"))
            .and(body_json(json!({"status": "todo", "isCompleted": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json("t1", "todo", false)))
            .mount(&server)
            .await;

        let task = store.set_task_complete("t1", true).await.unwrap();
        assert!(task.is_completed);
        assert_eq!(task.status, TaskStatus::Done);

        let task = store.set_task_complete("t1", false).await.unwrap();
        assert!(!task.is_completed);
        assert_eq!(store.tasks().await[0].status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn test_delete_task_failure_keeps_entry() {
        let server = MockServer::start().await;
        let store = store_with_tasks(&server, json!([task_json("t1", "todo", false)])).await;
        Mock::given(method("DELETE"))
            .and(path("/api/tasks/t1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Task not found"})))
            .mount(&server)
            .await;

        assert!(store.delete_task("t1").await.is_err());
        let state = store.snapshot().await;
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.error.as_deref(), Some("Task not found (HTTP 404)"));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_delete_task_removes_entry() {
        let server = MockServer::start().await;
        let store = store_with_tasks(
            &server,
            json!([task_json("t1", "todo", false), task_json("t2", "todo", false)]),
        )
        .await;
        Mock::given(method("DELETE"))
            .and(path("/api/tasks/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        store.delete_task("t1").await.unwrap();
        let ids: Vec<String> = store.tasks().await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t2"]);
    }
}
