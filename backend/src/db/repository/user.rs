//! Credential store trait.

use async_trait::async_trait;
use std::collections::HashMap;

use super::error::RepositoryResult;
use crate::api::{User, UserId};

/// Repository trait for user records.
///
/// Usernames are unique: implementations must reject an insert or update that
/// would create a second user with the same username with
/// [`RepositoryError::DuplicateKey`](super::RepositoryError::DuplicateKey).
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user.
    ///
    /// # Returns
    /// * `Ok(User)` - The stored record
    /// * `Err(RepositoryError::DuplicateKey)` - If the username is taken
    async fn insert_user(&self, user: &User) -> RepositoryResult<User>;

    /// Fetch a user by id, `None` if absent.
    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>>;

    /// Fetch a user by exact username, `None` if absent.
    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// Overwrite a stored user.
    ///
    /// # Returns
    /// * `Ok(Some(User))` - The updated record
    /// * `Ok(None)` - If no user with that id exists
    /// * `Err(RepositoryError::DuplicateKey)` - If the new username is taken
    async fn update_user(&self, user: &User) -> RepositoryResult<Option<User>>;

    /// Delete a user, returning the removed record if it existed.
    async fn delete_user(&self, id: UserId) -> RepositoryResult<Option<User>>;

    /// List all users in creation order.
    async fn list_users(&self) -> RepositoryResult<Vec<User>>;

    /// Resolve current usernames for a set of ids. Unknown ids are omitted.
    async fn usernames_for(&self, ids: &[UserId]) -> RepositoryResult<HashMap<UserId, String>>;
}
