//! Application state for the HTTP server.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::FullRepository;
use crate::services::{AuthService, PasswordHasher, RaceService, TokenIssuer};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository handle, used directly only by the health probe
    pub repository: Arc<dyn FullRepository>,
    pub auth: Arc<AuthService>,
    pub races: Arc<RaceService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire both services to `repository` using the settings in `config`.
    pub fn new(repository: Arc<dyn FullRepository>, config: AppConfig) -> Self {
        let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl);
        let auth = AuthService::new(
            repository.clone(),
            PasswordHasher::new(config.bcrypt_cost),
            tokens,
        );
        let races = RaceService::with_mutation_attempts(repository.clone(), config.mutation_attempts);

        Self {
            repository,
            auth: Arc::new(auth),
            races: Arc::new(races),
            config: Arc::new(config),
        }
    }
}
