//! Registration, login, bearer verification and user administration.

use chrono::Utc;
use std::sync::Arc;

use super::error::{ServiceError, ServiceResult};
use super::ids::parse_user_id;
use super::passwords::PasswordHasher;
use super::tokens::{Claims, TokenIssuer};
use crate::api::{Role, User, UserId, UserProfile, UserSummary, UserUpdate};
use crate::db::{FullRepository, RepositoryError, UserRepository};

/// Registration request after transport decoding.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Successful login: a signed credential and the public identity it asserts.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserSummary,
}

/// The single authorization check used by every role-restricted operation.
pub fn require_role(claims: &Claims, role: Role) -> ServiceResult<()> {
    if claims.role == role {
        Ok(())
    } else {
        Err(ServiceError::admin_required())
    }
}

fn username_taken(err: RepositoryError) -> ServiceError {
    if err.is_duplicate_key() {
        ServiceError::Conflict("Username already exists".to_string())
    } else {
        err.into()
    }
}

fn required(value: &str, field: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub struct AuthService {
    repo: Arc<dyn FullRepository>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(repo: Arc<dyn FullRepository>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            repo,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// bcrypt is deliberately slow; keep it off the async workers.
    async fn hash_password(&self, password: String) -> ServiceResult<String> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::Internal(format!("Task join error: {}", e)))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> ServiceResult<bool> {
        let hasher = self.hasher;
        let (password, hash) = (password.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("Task join error: {}", e)))
    }

    pub async fn register(&self, registration: Registration) -> ServiceResult<UserId> {
        let username = required(&registration.username, "Username")?;
        if registration.password.is_empty() {
            return Err(ServiceError::InvalidInput("Password is required".to_string()));
        }

        if self.repo.find_user_by_username(&username).await?.is_some() {
            return Err(ServiceError::Conflict("Username already exists".to_string()));
        }

        let user = User {
            id: UserId::generate(),
            username,
            password_hash: self.hash_password(registration.password).await?,
            role: registration.role,
            created_at: Utc::now(),
        };
        // The store enforces uniqueness too; a concurrent registration loses here.
        let stored = self.repo.insert_user(&user).await.map_err(username_taken)?;
        log::info!("Registered user {} ({})", stored.username, stored.role);
        Ok(stored.id)
    }

    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let Some(user) = self.repo.find_user_by_username(username.trim()).await? else {
            return Err(ServiceError::InvalidCredentials);
        };
        if !self.verify_password(password, &user.password_hash).await? {
            log::warn!("Failed login for {}", user.username);
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(LoginOutcome {
            token: self.tokens.issue(&user)?,
            user: UserSummary::from(&user),
        })
    }

    /// Validates a raw bearer token. `None` means no credential was presented.
    pub fn verify(&self, token: Option<&str>) -> ServiceResult<Claims> {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            None => Err(ServiceError::Unauthenticated),
            Some(token) => self.tokens.verify(token),
        }
    }

    pub async fn get_profile(&self, id: UserId) -> ServiceResult<UserProfile> {
        self.repo
            .get_user(id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(ServiceError::user_not_found)
    }

    /// Applies the non-empty fields of `update`; the password is re-hashed.
    pub async fn update_profile(&self, id: UserId, update: UserUpdate) -> ServiceResult<UserProfile> {
        let mut user = self
            .repo
            .get_user(id)
            .await?
            .ok_or_else(ServiceError::user_not_found)?;

        if let Some(username) = update.username.as_deref().map(str::trim) {
            if !username.is_empty() {
                user.username = username.to_string();
            }
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            user.password_hash = self.hash_password(password).await?;
        }

        self.repo
            .update_user(&user)
            .await
            .map_err(username_taken)?
            .map(UserProfile::from)
            .ok_or_else(ServiceError::user_not_found)
    }

    pub async fn list_users(&self, caller: &Claims) -> ServiceResult<Vec<UserProfile>> {
        require_role(caller, Role::Admin)?;
        Ok(self
            .repo
            .list_users()
            .await?
            .into_iter()
            .map(UserProfile::from)
            .collect())
    }

    /// Roster entries of a deleted user keep their username snapshot.
    pub async fn delete_user(&self, caller: &Claims, target: &str) -> ServiceResult<()> {
        require_role(caller, Role::Admin)?;
        let id = parse_user_id(target)?;
        match self.repo.delete_user(id).await? {
            Some(user) => {
                log::info!("User {} deleted by {}", user.username, caller.username);
                Ok(())
            }
            None => Err(ServiceError::user_not_found()),
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
