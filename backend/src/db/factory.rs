//! Repository selection and construction.
//!
//! The server never reaches for a global store; it asks the factory for an
//! `Arc<dyn FullRepository>` once at startup and injects it into the services.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositoryConfig;
use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};
use super::PostgresConfig;

/// Which storage backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Postgres + Diesel document store
    Postgres,
    /// In-memory store, lost on restart
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "local" | "memory" | "in-memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Reads `REPOSITORY_TYPE`. Without it, a configured database URL selects
    /// Postgres and anything else selects the local store.
    pub fn from_env() -> Result<Self, RepositoryError> {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            return val.parse().map_err(RepositoryError::configuration);
        }

        if std::env::var("DATABASE_URL").is_ok() || std::env::var("PG_DATABASE_URL").is_ok() {
            Ok(Self::Postgres)
        } else {
            Ok(Self::Local)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Local => "local",
        }
    }
}

#[cfg(not(feature = "postgres-repo"))]
fn postgres_disabled() -> RepositoryError {
    RepositoryError::configuration("Postgres repository feature not enabled")
}

/// Creates repository instances from explicit settings, the environment, or
/// a `repository.toml` file.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository of the given type. Postgres requires a config.
    pub async fn create(
        repo_type: RepositoryType,
        postgres_config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        match repo_type {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => {
                let config = postgres_config.ok_or_else(|| {
                    RepositoryError::configuration(
                        "Postgres repository requires PostgresConfig",
                    )
                })?;
                Self::create_postgres(config).await
            }
        }
    }

    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = config.clone();
        // Pool construction and migrations block; keep them off the runtime threads.
        let repo = tokio::task::spawn_blocking(move || PostgresRepository::new(config))
            .await
            .map_err(|e| RepositoryError::internal(format!("Task join error: {}", e)))??;
        Ok(Arc::new(repo))
    }

    #[cfg(not(feature = "postgres-repo"))]
    pub async fn create_postgres(
        _config: &PostgresConfig,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        Err(postgres_disabled())
    }

    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create a repository using `REPOSITORY_TYPE` and the `PG_*` variables.
    pub async fn from_env() -> RepositoryResult<Arc<dyn FullRepository>> {
        match RepositoryType::from_env()? {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => {
                let config = postgres_config_from_env()?;
                Self::create_postgres(&config).await
            }
        }
    }

    /// Create a repository from a `repository.toml` file.
    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config).await
    }

    pub async fn from_repository_config(
        config: &RepositoryConfig,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        match config.repository_type()? {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => {
                let pg_config = config.to_postgres_config()?.ok_or_else(|| {
                    RepositoryError::configuration(
                        "Postgres repository requires database configuration",
                    )
                })?;
                Self::create_postgres(&pg_config).await
            }
        }
    }

    /// Startup resolution order: an explicit `REPOSITORY_TYPE` wins, then a
    /// `repository.toml` in a standard location, then the environment defaults.
    pub async fn resolve() -> RepositoryResult<Arc<dyn FullRepository>> {
        if std::env::var("REPOSITORY_TYPE").is_err() {
            if let Some(config) = RepositoryConfig::find_default()? {
                log::info!("Using repository settings from repository.toml");
                return Self::from_repository_config(&config).await;
            }
        }
        Self::from_env().await
    }
}

#[cfg(feature = "postgres-repo")]
fn postgres_config_from_env() -> RepositoryResult<PostgresConfig> {
    PostgresConfig::from_env().map_err(RepositoryError::configuration)
}

#[cfg(not(feature = "postgres-repo"))]
fn postgres_config_from_env() -> RepositoryResult<PostgresConfig> {
    Err(postgres_disabled())
}
