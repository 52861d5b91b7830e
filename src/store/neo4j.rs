//! Neo4j-backed DocumentStore
//!
//! Each document is a single node (`:Project`, `:Task`, `:User`) whose
//! properties hold the document fields. Cross references stay as list
//! properties (`task_ids`, `project_ids`) rather than relationships so both
//! backends share the same denormalized model.

use crate::store::error::StoreError;
use crate::store::models::*;
use crate::store::traits::DocumentStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use neo4rs::{query, Graph, Query};
use std::sync::Arc;
use uuid::Uuid;

/// Client for the Neo4j document collections
pub struct Neo4jStore {
    graph: Arc<Graph>,
}

/// Fixed-width RFC 3339 so lexical ORDER BY matches chronological order
fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: Result<String, neo4rs::DeError>) -> DateTime<Utc> {
    raw.ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn non_empty(raw: Result<String, neo4rs::DeError>) -> Option<String> {
    raw.ok().filter(|s| !s.is_empty())
}

impl Neo4jStore {
    /// Connect to Neo4j and make sure the schema exists
    pub async fn new(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;

        let store = Self {
            graph: Arc::new(graph),
        };
        store.init_schema().await?;

        Ok(store)
    }

    /// Create uniqueness constraints and owner indexes
    async fn init_schema(&self) -> Result<()> {
        let statements = [
            "CREATE CONSTRAINT project_id IF NOT EXISTS FOR (p:Project) REQUIRE p.id IS UNIQUE",
            "CREATE CONSTRAINT task_id IF NOT EXISTS FOR (t:Task) REQUIRE t.id IS UNIQUE",
            "CREATE CONSTRAINT user_id IF NOT EXISTS FOR (u:User) REQUIRE u.id IS UNIQUE",
            "CREATE CONSTRAINT user_email IF NOT EXISTS FOR (u:User) REQUIRE u.email IS UNIQUE",
            "CREATE INDEX project_owner IF NOT EXISTS FOR (p:Project) ON (p.owner_id)",
            "CREATE INDEX task_owner IF NOT EXISTS FOR (t:Task) ON (t.owner_id)",
        ];

        for statement in statements {
            if let Err(e) = self.graph.run(query(statement)).await {
                tracing::warn!("Schema statement failed ({}): {}", statement, e);
            }
        }

        Ok(())
    }

    /// Run a query expected to return a single integer column
    async fn fetch_count(&self, q: Query, column: &str) -> Result<i64> {
        let mut result = self.graph.execute(q).await?;
        match result.next().await? {
            Some(row) => Ok(row.get::<i64>(column)?),
            None => Ok(0),
        }
    }

    fn node_to_project(node: &neo4rs::Node) -> Result<ProjectDoc> {
        Ok(ProjectDoc {
            id: node.get::<String>("id")?.parse()?,
            owner_id: node.get::<String>("owner_id")?.parse()?,
            name: node.get("name")?,
            description: node.get("description").unwrap_or_default(),
            color: node
                .get("color")
                .unwrap_or_else(|_| DEFAULT_PROJECT_COLOR.to_string()),
            task_ids: node.get("task_ids").unwrap_or_default(),
            created_at: parse_ts(node.get("created_at")),
            updated_at: parse_ts(node.get("updated_at")),
        })
    }

    fn node_to_task(node: &neo4rs::Node) -> Result<TaskDoc> {
        Ok(TaskDoc {
            id: node.get::<String>("id")?.parse()?,
            owner_id: node.get::<String>("owner_id")?.parse()?,
            title: node.get("title")?,
            description: node.get("description").unwrap_or_default(),
            status: node
                .get::<String>("status")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            priority: node
                .get::<String>("priority")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            due_date: non_empty(node.get("due_date"))
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            assignee: non_empty(node.get("assignee")),
            project_ids: node.get("project_ids").unwrap_or_default(),
            is_completed: node.get("is_completed").unwrap_or(false),
            tags: node.get("tags").unwrap_or_default(),
            created_at: parse_ts(node.get("created_at")),
            updated_at: parse_ts(node.get("updated_at")),
        })
    }

    fn node_to_user(node: &neo4rs::Node) -> Result<UserDoc> {
        Ok(UserDoc {
            id: node.get::<String>("id")?.parse()?,
            name: node.get("name")?,
            email: node.get("email")?,
            password_hash: node.get("password_hash")?,
            created_at: parse_ts(node.get("created_at")),
            updated_at: parse_ts(node.get("updated_at")),
        })
    }

    async fn fetch_one<T>(
        &self,
        q: Query,
        column: &str,
        convert: fn(&neo4rs::Node) -> Result<T>,
    ) -> Result<Option<T>> {
        let mut result = self.graph.execute(q).await?;
        if let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get(column)?;
            Ok(Some(convert(&node)?))
        } else {
            Ok(None)
        }
    }

    async fn fetch_all<T>(
        &self,
        q: Query,
        column: &str,
        convert: fn(&neo4rs::Node) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut result = self.graph.execute(q).await?;
        let mut items = Vec::new();
        while let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get(column)?;
            items.push(convert(&node)?);
        }
        Ok(items)
    }
}

#[async_trait]
impl DocumentStore for Neo4jStore {
    fn backend_name(&self) -> &'static str {
        "neo4j"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.graph.run(query("RETURN 1 AS ping")).await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    // ========================================================================
    // Users
    // ========================================================================

    async fn create_user(&self, user: &UserDoc) -> Result<()> {
        // MERGE on the unique email locks the key, so concurrent signups
        // resolve to one insert and the others see an existing node.
        let q = query(
            r#"
            MERGE (u:User {email: $email})
            ON CREATE SET u.id = $id,
                          u.name = $name,
                          u.password_hash = $password_hash,
                          u.created_at = $created_at,
                          u.updated_at = $updated_at
            RETURN u.id = $id AS created
            "#,
        )
        .param("id", user.id.to_string())
        .param("name", user.name.clone())
        .param("email", user.email.clone())
        .param("password_hash", user.password_hash.clone())
        .param("created_at", ts(user.created_at))
        .param("updated_at", ts(user.updated_at));

        let mut result = self
            .graph
            .execute(q)
            .await
            .context("Failed to create user")?;
        match result.next().await? {
            Some(row) if row.get::<bool>("created")? => Ok(()),
            _ => Err(StoreError::DuplicateEmail(user.email.clone()).into()),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        let q = query("MATCH (u:User {email: $email}) RETURN u").param("email", email);
        self.fetch_one(q, "u", Self::node_to_user).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserDoc>> {
        let q = query("MATCH (u:User {id: $id}) RETURN u").param("id", id.to_string());
        self.fetch_one(q, "u", Self::node_to_user).await
    }

    // ========================================================================
    // Projects
    // ========================================================================

    async fn create_project(&self, project: &ProjectDoc) -> Result<()> {
        let q = query(
            r#"
            CREATE (p:Project {
                id: $id,
                owner_id: $owner_id,
                name: $name,
                description: $description,
                color: $color,
                task_ids: $task_ids,
                created_at: $created_at,
                updated_at: $updated_at
            })
            "#,
        )
        .param("id", project.id.to_string())
        .param("owner_id", project.owner_id.to_string())
        .param("name", project.name.clone())
        .param("description", project.description.clone())
        .param("color", project.color.clone())
        .param("task_ids", project.task_ids.clone())
        .param("created_at", ts(project.created_at))
        .param("updated_at", ts(project.updated_at));

        self.graph.run(q).await?;
        Ok(())
    }

    async fn get_project(&self, id: Uuid, owner_id: Uuid) -> Result<Option<ProjectDoc>> {
        let q = query("MATCH (p:Project {id: $id, owner_id: $owner_id}) RETURN p")
            .param("id", id.to_string())
            .param("owner_id", owner_id.to_string());
        self.fetch_one(q, "p", Self::node_to_project).await
    }

    async fn list_projects(&self, owner_id: Uuid) -> Result<Vec<ProjectDoc>> {
        let q = query(
            r#"
            MATCH (p:Project {owner_id: $owner_id})
            RETURN p
            ORDER BY p.updated_at DESC
            "#,
        )
        .param("owner_id", owner_id.to_string());
        self.fetch_all(q, "p", Self::node_to_project).await
    }

    async fn update_project(&self, project: &ProjectDoc) -> Result<bool> {
        let q = query(
            r#"
            MATCH (p:Project {id: $id, owner_id: $owner_id})
            SET p.name = $name,
                p.description = $description,
                p.color = $color,
                p.task_ids = $task_ids,
                p.updated_at = $updated_at
            RETURN count(p) AS matched
            "#,
        )
        .param("id", project.id.to_string())
        .param("owner_id", project.owner_id.to_string())
        .param("name", project.name.clone())
        .param("description", project.description.clone())
        .param("color", project.color.clone())
        .param("task_ids", project.task_ids.clone())
        .param("updated_at", ts(project.updated_at));

        Ok(self.fetch_count(q, "matched").await? > 0)
    }

    async fn delete_project(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let q = query(
            r#"
            MATCH (p:Project {id: $id, owner_id: $owner_id})
            DETACH DELETE p
            RETURN count(*) AS deleted
            "#,
        )
        .param("id", id.to_string())
        .param("owner_id", owner_id.to_string());

        Ok(self.fetch_count(q, "deleted").await? > 0)
    }

    async fn push_task_to_project(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
        task_id: &str,
    ) -> Result<LinkOutcome> {
        let q = query(
            r#"
            MATCH (p:Project {id: $id, owner_id: $owner_id})
            WITH p, coalesce(p.task_ids, []) AS current
            WITH p, current, $task_id IN current AS present
            SET p.task_ids = CASE WHEN present THEN current ELSE current + $task_id END,
                p.updated_at = CASE WHEN present THEN p.updated_at ELSE $now END
            RETURN present
            "#,
        )
        .param("id", project_id.to_string())
        .param("owner_id", owner_id.to_string())
        .param("task_id", task_id)
        .param("now", ts(Utc::now()));

        let mut result = self.graph.execute(q).await?;
        match result.next().await? {
            Some(row) if row.get::<bool>("present")? => Ok(LinkOutcome::AlreadyLinked),
            Some(_) => Ok(LinkOutcome::Linked),
            None => Ok(LinkOutcome::ProjectNotFound),
        }
    }

    async fn pull_task_from_project(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
        task_id: &str,
    ) -> Result<bool> {
        let q = query(
            r#"
            MATCH (p:Project {id: $id, owner_id: $owner_id})
            SET p.task_ids = [x IN coalesce(p.task_ids, []) WHERE x <> $task_id],
                p.updated_at = $now
            RETURN count(p) AS matched
            "#,
        )
        .param("id", project_id.to_string())
        .param("owner_id", owner_id.to_string())
        .param("task_id", task_id)
        .param("now", ts(Utc::now()));

        Ok(self.fetch_count(q, "matched").await? > 0)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    async fn create_task(&self, task: &TaskDoc) -> Result<()> {
        let q = query(
            r#"
            CREATE (t:Task {
                id: $id,
                owner_id: $owner_id,
                title: $title,
                description: $description,
                status: $status,
                priority: $priority,
                due_date: $due_date,
                assignee: $assignee,
                project_ids: $project_ids,
                is_completed: $is_completed,
                tags: $tags,
                created_at: $created_at,
                updated_at: $updated_at
            })
            "#,
        )
        .param("id", task.id.to_string())
        .param("owner_id", task.owner_id.to_string())
        .param("title", task.title.clone())
        .param("description", task.description.clone())
        .param("status", task.status.to_string())
        .param("priority", task.priority.to_string())
        .param("due_date", task.due_date.map(ts).unwrap_or_default())
        .param("assignee", task.assignee.clone().unwrap_or_default())
        .param("project_ids", task.project_ids.clone())
        .param("is_completed", task.is_completed)
        .param("tags", task.tags.clone())
        .param("created_at", ts(task.created_at))
        .param("updated_at", ts(task.updated_at));

        self.graph.run(q).await?;
        Ok(())
    }

    async fn get_task(&self, id: Uuid, owner_id: Uuid) -> Result<Option<TaskDoc>> {
        let q = query("MATCH (t:Task {id: $id, owner_id: $owner_id}) RETURN t")
            .param("id", id.to_string())
            .param("owner_id", owner_id.to_string());
        self.fetch_one(q, "t", Self::node_to_task).await
    }

    async fn list_tasks(&self, owner_id: Uuid) -> Result<Vec<TaskDoc>> {
        let q = query(
            r#"
            MATCH (t:Task {owner_id: $owner_id})
            RETURN t
            ORDER BY t.updated_at DESC
            "#,
        )
        .param("owner_id", owner_id.to_string());
        self.fetch_all(q, "t", Self::node_to_task).await
    }

    async fn update_task(&self, task: &TaskDoc) -> Result<bool> {
        let q = query(
            r#"
            MATCH (t:Task {id: $id, owner_id: $owner_id})
            SET t.title = $title,
                t.description = $description,
                t.status = $status,
                t.priority = $priority,
                t.due_date = $due_date,
                t.assignee = $assignee,
                t.project_ids = $project_ids,
                t.is_completed = $is_completed,
                t.tags = $tags,
                t.updated_at = $updated_at
            RETURN count(t) AS matched
            "#,
        )
        .param("id", task.id.to_string())
        .param("owner_id", task.owner_id.to_string())
        .param("title", task.title.clone())
        .param("description", task.description.clone())
        .param("status", task.status.to_string())
        .param("priority", task.priority.to_string())
        .param("due_date", task.due_date.map(ts).unwrap_or_default())
        .param("assignee", task.assignee.clone().unwrap_or_default())
        .param("project_ids", task.project_ids.clone())
        .param("is_completed", task.is_completed)
        .param("tags", task.tags.clone())
        .param("updated_at", ts(task.updated_at));

        Ok(self.fetch_count(q, "matched").await? > 0)
    }

    async fn delete_task(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let q = query(
            r#"
            MATCH (t:Task {id: $id, owner_id: $owner_id})
            DETACH DELETE t
            RETURN count(*) AS deleted
            "#,
        )
        .param("id", id.to_string())
        .param("owner_id", owner_id.to_string());

        Ok(self.fetch_count(q, "deleted").await? > 0)
    }

    async fn pull_project_from_tasks(&self, project_id: &str, owner_id: Uuid) -> Result<usize> {
        let q = query(
            r#"
            MATCH (t:Task {owner_id: $owner_id})
            WHERE $project_id IN t.project_ids
            SET t.project_ids = [x IN t.project_ids WHERE x <> $project_id],
                t.updated_at = $now
            RETURN count(t) AS changed
            "#,
        )
        .param("owner_id", owner_id.to_string())
        .param("project_id", project_id)
        .param("now", ts(Utc::now()));

        Ok(self.fetch_count(q, "changed").await?.max(0) as usize)
    }
}
