//! Storage layer for users and races.
//!
//! ```text
//! services (auth, races)
//!         │  Arc<dyn FullRepository>
//!         ▼
//! repository traits ── UserRepository + RaceRepository
//!         │
//!   ┌─────┴──────────────┐
//!   LocalRepository      PostgresRepository (feature `postgres-repo`)
//! ```
//!
//! Backends are picked at startup by [`RepositoryFactory`] and handed to the
//! services explicitly; there is no process-wide store.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;

/// Placeholder so factory signatures stay the same without the Postgres backend.
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, FullRepository, RaceRepository, RepositoryError, RepositoryResult,
    UserRepository,
};
