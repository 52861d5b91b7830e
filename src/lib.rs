//! Taskboard
//!
//! A task and project tracker with:
//! - REST API for projects and tasks, scoped to the authenticated owner
//! - Reference synchronizer keeping task/project id lists consistent
//! - Password, demo and JWT session authentication
//! - Pluggable persistence (Neo4j or in-memory)
//! - Client-side stores and the `taskctl` command-line front end

pub mod api;
pub mod auth;
pub mod board;
pub mod client;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use store::DocumentStore;

/// Minimum length of the JWT signing secret
pub const MIN_JWT_SECRET_LEN: usize = 32;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub storage: StorageYamlConfig,
    pub neo4j: Neo4jYamlConfig,
    pub auth: AuthYamlConfig,
    pub references: ReferencesConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Which DocumentStore implementation backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Neo4j,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Neo4j => f.write_str("neo4j"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "neo4j" => Ok(Self::Neo4j),
            other => bail!("Unknown storage backend '{}' (expected memory or neo4j)", other),
        }
    }
}

/// Storage configuration section
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageYamlConfig {
    pub backend: StorageBackend,
}

/// Neo4j configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jYamlConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for Neo4jYamlConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "taskboard".into(),
        }
    }
}

/// Auth configuration section as written in YAML.
///
/// `jwt_secret` may be left out of the file and supplied via `JWT_SECRET`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthYamlConfig {
    pub jwt_secret: Option<String>,
    pub jwt_expiry_secs: u64,
    pub allow_registration: bool,
    pub allow_demo: bool,
    pub bcrypt_cost: u32,
}

impl Default for AuthYamlConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiry_secs: 28800,
            allow_registration: true,
            allow_demo: true,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Reference synchronizer options
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReferencesConfig {
    /// Pull a deleted project's id out of the owner's tasks (default: false)
    pub cascade_project_delete: bool,
}

// ============================================================================
// Resolved config
// ============================================================================

/// Resolved auth settings used by the handlers
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret (HS256, minimum 32 characters)
    pub jwt_secret: String,
    /// JWT token lifetime in seconds (default: 28800 = 8h)
    pub jwt_expiry_secs: u64,
    /// Allow POST /api/auth/signup (default: true)
    pub allow_registration: bool,
    /// Allow POST /api/auth/demo (default: true)
    pub allow_demo: bool,
    /// bcrypt work factor for new password hashes (default: 12)
    pub bcrypt_cost: u32,
}

/// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub storage_backend: StorageBackend,
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub auth_config: AuthConfig,
    pub cascade_project_delete: bool,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults. Fails when no JWT secret
    /// of at least [`MIN_JWT_SECRET_LEN`] characters is configured.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path);

        // 2. Resolve the signing secret
        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .or(yaml.auth.jwt_secret)
            .filter(|s| !s.is_empty())
            .context("No JWT secret configured (set auth.jwt_secret or JWT_SECRET)")?;
        if jwt_secret.chars().count() < MIN_JWT_SECRET_LEN {
            bail!(
                "JWT secret must be at least {} characters",
                MIN_JWT_SECRET_LEN
            );
        }

        // 3. Build Config with env var overrides
        let storage_backend = match std::env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => yaml.storage.backend,
        };

        Ok(Self {
            server_host: std::env::var("SERVER_HOST").unwrap_or(yaml.server.host),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.server.port),
            storage_backend,
            neo4j_uri: std::env::var("NEO4J_URI").unwrap_or(yaml.neo4j.uri),
            neo4j_user: std::env::var("NEO4J_USER").unwrap_or(yaml.neo4j.user),
            neo4j_password: std::env::var("NEO4J_PASSWORD").unwrap_or(yaml.neo4j.password),
            auth_config: AuthConfig {
                jwt_secret,
                jwt_expiry_secs: yaml.auth.jwt_expiry_secs,
                allow_registration: yaml.auth.allow_registration,
                allow_demo: yaml.auth.allow_demo,
                bcrypt_cost: yaml.auth.bcrypt_cost,
            },
            cascade_project_delete: yaml.references.cascade_project_delete,
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

// ============================================================================
// Application state and server
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state, connecting the configured store once
    pub async fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.storage_backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Arc::new(store::MemoryStore::new())
            }
            StorageBackend::Neo4j => Arc::new(
                store::Neo4jStore::new(
                    &config.neo4j_uri,
                    &config.neo4j_user,
                    &config.neo4j_password,
                )
                .await?,
            ),
        };

        Ok(Self {
            store,
            config: Arc::new(config),
        })
    }

    /// Build the HTTP handler state
    pub fn server_state(&self) -> api::handlers::TaskboardState {
        let mut state =
            api::handlers::ServerState::new(self.store.clone(), self.config.auth_config.clone());
        state.cascade_project_delete = self.config.cascade_project_delete;
        Arc::new(state)
    }
}

/// Start the HTTP server and run until SIGINT/SIGTERM
pub async fn start_server(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(config).await?;
    tracing::info!(backend = %state.config.storage_backend, "Storage ready");

    let app = api::create_router(state.server_state());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Taskboard listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

// ============================================================================
// Tests
// ============================================================================
