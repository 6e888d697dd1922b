//! Repository traits for the two document collections (users and races).

pub mod error;
pub mod race;
pub mod user;

use async_trait::async_trait;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use race::RaceRepository;
pub use user::UserRepository;

/// Combined store handle injected into services and the HTTP state.
#[async_trait]
pub trait FullRepository: UserRepository + RaceRepository {
    /// Verify the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;
}
