//! Client-side project cache

use super::{remove_entry, replace_entry, ApiClient, ClientError, ClientResult, StoreState};
use crate::board::{CreateProjectRequest, Patch, Project, UpdateProjectRequest};
use tokio::sync::RwLock;

pub struct ProjectStore {
    api: ApiClient,
    state: RwLock<StoreState<Project>>,
}

impl ProjectStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Copy of the current cache and status
    pub async fn snapshot(&self) -> StoreState<Project> {
        self.state.read().await.clone()
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.state.read().await.items.clone()
    }

    /// Replace the cache with the server's list
    pub async fn fetch_projects(&self) -> ClientResult<Vec<Project>> {
        self.state.write().await.begin();
        let result = self.api.list_projects().await;
        self.state
            .write()
            .await
            .settle(result, |items, fetched| *items = fetched.clone())
    }

    /// Fetch one project. Refreshes the cached copy if there is one; never
    /// adds to the cache.
    pub async fn fetch_project_by_id(&self, id: &str) -> ClientResult<Project> {
        self.state.write().await.begin();
        let result = self.api.get_project(id).await;
        self.state.write().await.settle(result, |items, fresh| replace_entry(items, fresh))
    }

    pub async fn add_project(&self, req: &CreateProjectRequest) -> ClientResult<Project> {
        self.state.write().await.begin();
        let result = self.api.create_project(req).await;
        self.state
            .write()
            .await
            .settle(result, |items, created| items.push(created.clone()))
    }

    pub async fn update_project(
        &self,
        id: &str,
        req: &UpdateProjectRequest,
    ) -> ClientResult<Project> {
        self.state.write().await.begin();
        let result = self.api.update_project(id, req).await;
        self.state.write().await.settle(result, |items, fresh| replace_entry(items, fresh))
    }

    pub async fn delete_project(&self, id: &str) -> ClientResult<()> {
        self.state.write().await.begin();
        let result = self.api.delete_project(id).await;
        self.state
            .write()
            .await
            .settle(result, |items, _| remove_entry(items, id))
    }

    /// Append `task_id` to the cached project's task list and save it.
    /// No request is made when the id is already listed.
    pub async fn add_task_to_project(&self, project_id: &str, task_id: &str) -> ClientResult<()> {
        let tasks = {
            let mut state = self.state.write().await;
            let Some(project) = state.get(project_id) else {
                return state.settle(Err(not_cached()), |_, _| {});
            };
            if project.tasks.iter().any(|t| t == task_id) {
                return Ok(());
            }
            let mut tasks = project.tasks.clone();
            tasks.push(task_id.to_string());
            tasks
        };
        self.save_tasks(project_id, tasks).await
    }

    /// Drop `task_id` from the cached project's task list and save it
    pub async fn remove_task_from_project(
        &self,
        project_id: &str,
        task_id: &str,
    ) -> ClientResult<()> {
        let tasks = {
            let mut state = self.state.write().await;
            let Some(project) = state.get(project_id) else {
                return state.settle(Err(not_cached()), |_, _| {});
            };
            project
                .tasks
                .iter()
                .filter(|t| *t != task_id)
                .cloned()
                .collect::<Vec<_>>()
        };
        self.save_tasks(project_id, tasks).await
    }

    async fn save_tasks(&self, project_id: &str, tasks: Vec<String>) -> ClientResult<()> {
        let req = UpdateProjectRequest {
            tasks: Patch::Set(tasks),
            ..Default::default()
        };
        self.update_project(project_id, &req).await.map(|_| ())
    }
}

fn not_cached() -> ClientError {
    ClientError::NotCached("Project".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn project_json(id: &str, name: &str, tasks: &[&str]) -> Value {
        json!({
            "id": id,
            "name": name,
            "description": "",
            "color": "blue",
            "tasks": tasks,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z"
        })
    }

    async fn store_with_projects(server: &MockServer, projects: Value) -> ProjectStore {
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(projects))
            .mount(server)
            .await;
        let store = ProjectStore::new(ApiClient::new(&server.uri()).unwrap().with_token("t"));
        store.fetch_projects().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_fetch_projects_replaces_cache() {
        let server = MockServer::start().await;
        let store = store_with_projects(
            &server,
            json!([project_json("p1", "One", &[]), project_json("p2", "Two", &["t1"])]),
        )
        .await;

        let state = store.snapshot().await;
        assert_eq!(state.items.len(), 2);
        assert_eq!(state.items[1].tasks, vec!["t1"]);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_add_and_delete_project() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/projects"))
            .and(body_partial_json(json!({"name": "New"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(project_json("p9", "New", &[])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/projects/p9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let store = ProjectStore::new(ApiClient::new(&server.uri()).unwrap());
        let req = CreateProjectRequest {
            name: Some("New".to_string()),
            ..Default::default()
        };
        let created = store.add_project(&req).await.unwrap();
        assert_eq!(created.id, "p9");
        assert_eq!(store.projects().await.len(), 1);

        store.delete_project("p9").await.unwrap();
        assert!(store.projects().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_by_id_does_not_grow_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/p5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(project_json("p5", "Five", &[])))
            .mount(&server)
            .await;

        let store = ProjectStore::new(ApiClient::new(&server.uri()).unwrap());
        let project = store.fetch_project_by_id("p5").await.unwrap();
        assert_eq!(project.name, "Five");
        assert!(store.projects().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_records_error() {
        let server = MockServer::start().await;
        let store = store_with_projects(&server, json!([project_json("p1", "One", &[])])).await;
        Mock::given(method("PUT"))
            .and(path("/api/projects/p1"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "name cannot be null"})),
            )
            .mount(&server)
            .await;

        let req = UpdateProjectRequest {
            name: Patch::Null,
            ..Default::default()
        };
        let err = store.update_project("p1", &req).await.unwrap_err();
        assert_eq!(err.status(), Some(400));

        let state = store.snapshot().await;
        assert_eq!(state.error.as_deref(), Some("name cannot be null (HTTP 400)"));
        assert_eq!(state.items[0].name, "One");
    }

    #[tokio::test]
    async fn test_add_task_to_project_sends_full_list() {
        let server = MockServer::start().await;
        let store = store_with_projects(&server, json!([project_json("p1", "One", &["t1"])])).await;
        Mock::given(method("PUT"))
            .and(path("/api/projects/p1"))
            .and(body_partial_json(json!({"tasks": ["t1", "t2"]})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(project_json("p1", "One", &["t1", "t2"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        store.add_task_to_project("p1", "t2").await.unwrap();
        assert_eq!(store.projects().await[0].tasks, vec!["t1", "t2"]);

        // Already present: no second PUT
        store.add_task_to_project("p1", "t2").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_task_from_project() {
        let server = MockServer::start().await;
        let store =
            store_with_projects(&server, json!([project_json("p1", "One", &["t1", "t2"])])).await;
        Mock::given(method("PUT"))
            .and(path("/api/projects/p1"))
            .and(body_partial_json(json!({"tasks": ["t2"]})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(project_json("p1", "One", &["t2"])),
            )
            .mount(&server)
            .await;

        store.remove_task_from_project("p1", "t1").await.unwrap();
        assert_eq!(store.projects().await[0].tasks, vec!["t2"]);
    }

    #[tokio::test]
    async fn test_task_link_on_uncached_project_fails() {
        let server = MockServer::start().await;
        let store = ProjectStore::new(ApiClient::new(&server.uri()).unwrap());

        let err = store.add_task_to_project("nope", "t1").await.unwrap_err();
        assert!(matches!(err, ClientError::NotCached(_)));
        assert_eq!(
            store.snapshot().await.error.as_deref(),
            Some("Project not found")
        );
    }
}
