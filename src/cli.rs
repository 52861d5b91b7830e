//! Taskboard - CLI Tool
//!
//! Command-line front end over the client stores.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use taskboard::api::auth_handlers::SignupRequest;
use taskboard::api::TaskListQuery;
use taskboard::board::{
    CreateProjectRequest, CreateTaskRequest, DueDate, Patch, Project, Task, UpdateProjectRequest,
    UpdateTaskRequest,
};
use taskboard::client::{ApiClient, ProjectStore, TaskStore};
use taskboard::store::{TaskPriority, TaskStatus};

#[derive(Parser)]
#[command(name = "taskctl")]
#[command(about = "CLI for Taskboard")]
struct Cli {
    /// Taskboard server URL
    #[arg(long, env = "TASKBOARD_URL", default_value = "http://localhost:8080")]
    server: String,

    /// Session token (printed by `login` / `demo`)
    #[arg(long, env = "TASKBOARD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print a session token
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Start a demo session and print its token
    Demo,

    /// Register a new account
    Signup {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Show the current user
    Whoami,

    /// Project operations
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Task operations
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List projects
    List,

    /// Create a project
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        desc: Option<String>,

        #[arg(short, long)]
        color: Option<String>,
    },

    /// Show project details
    Show { id: String },

    /// Update a project
    Update {
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        desc: Option<String>,

        #[arg(short, long)]
        color: Option<String>,
    },

    /// Delete a project
    Delete { id: String },

    /// Add a task id to the project's task list
    AddTask {
        #[arg(long)]
        project: String,

        #[arg(long)]
        task: String,
    },

    /// Remove a task id from the project's task list
    RemoveTask {
        #[arg(long)]
        project: String,

        #[arg(long)]
        task: String,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// List tasks
    List {
        /// Comma-separated statuses (todo, in_progress, review, done)
        #[arg(long)]
        status: Option<String>,

        /// Comma-separated priorities (low, medium, high, urgent)
        #[arg(long)]
        priority: Option<String>,

        /// Only tasks in this project
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        tag: Option<String>,
    },

    /// Create a task
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        desc: Option<String>,

        #[arg(long)]
        priority: Option<TaskPriority>,

        /// RFC 3339 timestamp or YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        /// Project ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        projects: Vec<String>,

        /// Tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Show task details
    Show { id: String },

    /// Update task status
    Status { id: String, status: TaskStatus },

    /// Mark a task done
    Done { id: String },

    /// Reopen a completed task
    Reopen { id: String },

    /// Replace the task's project list (comma-separated, empty to clear)
    Move {
        id: String,

        #[arg(value_delimiter = ',')]
        projects: Vec<String>,
    },

    /// Delete a task
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut api = ApiClient::new(&cli.server)?;
    if let Some(token) = cli.token {
        api = api.with_token(token);
    }

    match cli.command {
        Commands::Login { email, password } => {
            let resp = api.login(&email, &password).await?;
            println!("Logged in as {} <{}>", resp.user.name, resp.user.email);
            println!("export TASKBOARD_TOKEN={}", resp.token);
        }
        Commands::Demo => {
            let resp = api.demo_login().await?;
            println!("Demo session for {}", resp.user.email);
            println!("export TASKBOARD_TOKEN={}", resp.token);
        }
        Commands::Signup {
            name,
            email,
            password,
        } => {
            let resp = api
                .signup(&SignupRequest {
                    name,
                    email,
                    password,
                })
                .await?;
            println!("{}: {}", resp.message, resp.user.id);
        }
        Commands::Whoami => {
            let user = api.me().await?;
            let demo = if user.demo { " (demo)" } else { "" };
            println!("{} <{}>{} {}", user.name, user.email, demo, user.id);
        }
        Commands::Project { action } => handle_project(ProjectStore::new(api), action).await?,
        Commands::Task { action } => handle_task(TaskStore::new(api), action).await?,
    }

    Ok(())
}

async fn handle_project(store: ProjectStore, action: ProjectAction) -> Result<()> {
    match action {
        ProjectAction::List => {
            let projects = store.fetch_projects().await?;
            println!("{:<36} {:<8} {:<6} NAME", "ID", "COLOR", "TASKS");
            println!("{}", "-".repeat(80));
            for project in projects {
                println!(
                    "{:<36} {:<8} {:<6} {}",
                    project.id,
                    project.color,
                    project.tasks.len(),
                    project.name
                );
            }
        }

        ProjectAction::Create { name, desc, color } => {
            let project = store
                .add_project(&CreateProjectRequest {
                    name: Some(name),
                    description: desc,
                    color,
                })
                .await?;
            println!("Created project: {}", project.id);
        }

        ProjectAction::Show { id } => {
            let project = store.fetch_project_by_id(&id).await?;
            print_json(&project)?;
        }

        ProjectAction::Update {
            id,
            name,
            desc,
            color,
        } => {
            let req = UpdateProjectRequest {
                name: patch_from(name),
                description: patch_from(desc),
                color: patch_from(color),
                ..Default::default()
            };
            let project = store.update_project(&id, &req).await?;
            print_json(&project)?;
        }

        ProjectAction::Delete { id } => {
            store.delete_project(&id).await?;
            println!("Deleted project: {}", id);
        }

        ProjectAction::AddTask { project, task } => {
            load_project(&store, &project).await?;
            store.add_task_to_project(&project, &task).await?;
            println!("Project {} lists task {}", project, task);
        }

        ProjectAction::RemoveTask { project, task } => {
            load_project(&store, &project).await?;
            store.remove_task_from_project(&project, &task).await?;
            println!("Removed task {} from project {}", task, project);
        }
    }

    Ok(())
}

async fn handle_task(store: TaskStore, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::List {
            status,
            priority,
            project,
            tag,
        } => {
            let query = TaskListQuery {
                status,
                priority,
                project_id: project,
                tag,
            };
            let tasks = store.fetch_tasks(&query).await?;
            println!("{:<36} {:<12} {:<8} TITLE", "ID", "STATUS", "PRI");
            println!("{}", "-".repeat(80));
            for task in tasks {
                print_task_row(&task);
            }
        }

        TaskAction::Add {
            title,
            desc,
            priority,
            due,
            assignee,
            projects,
            tags,
        } => {
            let due_date = due
                .as_deref()
                .map(DueDate::parse)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let req = CreateTaskRequest {
                title: Some(title),
                description: desc,
                priority,
                due_date,
                assignee,
                project_ids: Some(projects),
                tags: Some(tags),
                ..Default::default()
            };
            let task = store.add_task(&req).await?;
            println!("Created task: {}", task.id);
        }

        TaskAction::Show { id } => {
            let task = store
                .fetch_tasks(&TaskListQuery::default())
                .await?
                .into_iter()
                .find(|t| t.id == id)
                .with_context(|| format!("Task {} not found", id))?;
            print_json(&task)?;
        }

        TaskAction::Status { id, status } => {
            let task = store.set_task_status(&id, status).await?;
            println!("Updated task status to: {}", task.status);
        }

        TaskAction::Done { id } => {
            store.set_task_complete(&id, true).await?;
            println!("Completed task: {}", id);
        }

        TaskAction::Reopen { id } => {
            store.set_task_complete(&id, false).await?;
            println!("Reopened task: {}", id);
        }

        TaskAction::Move { id, projects } => {
            let projects: Vec<String> = projects.into_iter().filter(|p| !p.is_empty()).collect();
            let req = UpdateTaskRequest {
                project_ids: Patch::Set(projects),
                ..Default::default()
            };
            let task = store.update_task(&id, &req).await?;
            println!("Task {} is in: {}", task.id, task.project_ids.join(", "));
        }

        TaskAction::Delete { id } => {
            store.delete_task(&id).await?;
            println!("Deleted task: {}", id);
        }
    }

    Ok(())
}

/// Cache the project list so task link edits start from the server's state
async fn load_project(store: &ProjectStore, id: &str) -> Result<Project> {
    store
        .fetch_projects()
        .await?
        .into_iter()
        .find(|p| p.id == id)
        .with_context(|| format!("Project {} not found", id))
}

fn patch_from(value: Option<String>) -> Patch<String> {
    value.map(Patch::Set).unwrap_or(Patch::Absent)
}

fn print_task_row(task: &Task) {
    let mark = if task.is_completed { "x" } else { " " };
    println!(
        "{:<36} {:<12} {:<8} [{}] {}",
        task.id,
        task.status.to_string(),
        task.priority.to_string(),
        mark,
        task.title
    );
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
