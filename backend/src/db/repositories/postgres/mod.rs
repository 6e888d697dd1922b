//! Postgres repository implementation using Diesel.
//!
//! Users are stored as plain rows with a unique username. Races are stored as
//! JSONB documents next to a few indexed columns (`name`, `revision`,
//! `created_at`); roster filters use JSONB containment on the document.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Optimistic concurrency on race documents through the `revision` column
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task;

use crate::api::{Race, RaceFilter, RaceId, Role, User, UserId};
use crate::db::repository::{
    ErrorContext, FullRepository, RaceRepository, RepositoryError, RepositoryResult,
    UserRepository,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;
        let defaults = Self::default();

        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Builds the pool and applies pending migrations. Blocking.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        let mut conn = pool.get().map_err(|e| {
            RepositoryError::connection_with_context(e.to_string(), ErrorContext::new("migrate"))
        })?;
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("migrate"),
            )
        })?;
        drop(conn);

        log::info!(
            "Postgres repository ready (pool max={}, min={})",
            config.max_pool_size,
            config.min_pool_size
        );

        Ok(Self { pool, config })
    }

    /// Runs `f` on a pooled connection off the async runtime.
    ///
    /// Only errors flagged retryable (connection loss, serialization
    /// failures) are replayed, with exponential backoff. Revision conflicts
    /// go back to the caller, which must re-read the document first.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);

        task::spawn_blocking(move || {
            let mut attempt = 0;
            loop {
                let result = pool
                    .get()
                    .map_err(|e| {
                        RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        )
                    })
                    .and_then(|mut conn| f.clone()(&mut conn));

                match result {
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        log::warn!("Retrying after transient failure: {}", e);
                        std::thread::sleep(delay);
                        delay *= 2;
                        attempt += 1;
                    }
                    other => return other,
                }
            }
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

// =============================================================================
// Row conversions
// =============================================================================

fn user_to_row(user: &User) -> UserRow {
    UserRow {
        id: user.id.to_string(),
        username: user.username.clone(),
        password_hash: user.password_hash.clone(),
        role: user.role.as_str().to_string(),
        created_at: user.created_at,
    }
}

fn row_to_user(row: UserRow) -> RepositoryResult<User> {
    let id = UserId::parse(&row.id).ok_or_else(|| {
        RepositoryError::internal_with_context(
            "stored user id is not a valid identifier",
            ErrorContext::new("row_to_user").with_entity_id(&row.id),
        )
    })?;
    let role = row.role.parse::<Role>().map_err(|e| {
        RepositoryError::internal_with_context(
            e,
            ErrorContext::new("row_to_user").with_entity_id(&row.id),
        )
    })?;
    Ok(User {
        id,
        username: row.username,
        password_hash: row.password_hash,
        role,
        created_at: row.created_at,
    })
}

fn race_to_row(race: &Race, revision: i64) -> RepositoryResult<NewRaceRow> {
    Ok(NewRaceRow {
        id: race.id.to_string(),
        name: race.name.clone(),
        revision,
        created_at: race.created_at,
        document: serde_json::to_value(race)?,
    })
}

fn row_to_race(row: RaceRow) -> RepositoryResult<Race> {
    let mut race: Race = serde_json::from_value(row.document).map_err(|e| {
        RepositoryError::internal_with_context(
            format!("Failed to decode race document: {e}"),
            ErrorContext::new("row_to_race").with_entity_id(&row.id),
        )
    })?;
    race.revision = row.revision.max(0) as u64;
    Ok(race)
}

// =============================================================================
// Repository trait implementations
// =============================================================================

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn insert_user(&self, user: &User) -> RepositoryResult<User> {
        let row = user_to_row(user);
        self.with_conn(move |conn| {
            let inserted: UserRow = diesel::insert_into(users::table)
                .values(&row)
                .returning(UserRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("insert_user"))?;
            row_to_user(inserted)
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        self.with_conn(move |conn| {
            users::table
                .filter(users::id.eq(id.to_string()))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(row_to_user)
                .transpose()
        })
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            users::table
                .filter(users::username.eq(&username))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(row_to_user)
                .transpose()
        })
        .await
    }

    async fn update_user(&self, user: &User) -> RepositoryResult<Option<User>> {
        let row = user_to_row(user);
        self.with_conn(move |conn| {
            diesel::update(users::table.filter(users::id.eq(&row.id)))
                .set(&row)
                .returning(UserRow::as_returning())
                .get_result::<UserRow>(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_user"))?
                .map(row_to_user)
                .transpose()
        })
        .await
    }

    async fn delete_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        self.with_conn(move |conn| {
            diesel::delete(users::table.filter(users::id.eq(id.to_string())))
                .returning(UserRow::as_returning())
                .get_result::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(row_to_user)
                .transpose()
        })
        .await
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        self.with_conn(|conn| {
            users::table
                .select(UserRow::as_select())
                .order((users::created_at.asc(), users::id.asc()))
                .load::<UserRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(row_to_user)
                .collect()
        })
        .await
    }

    async fn usernames_for(&self, ids: &[UserId]) -> RepositoryResult<HashMap<UserId, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let keys: Vec<String> = ids.iter().map(ToString::to_string).collect();
        self.with_conn(move |conn| {
            let rows: Vec<(String, String)> = users::table
                .filter(users::id.eq_any(&keys))
                .select((users::id, users::username))
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows
                .into_iter()
                .filter_map(|(id, username)| UserId::parse(&id).map(|id| (id, username)))
                .collect())
        })
        .await
    }
}

#[async_trait]
impl RaceRepository for PostgresRepository {
    async fn insert_race(&self, race: &Race) -> RepositoryResult<Race> {
        let row = race_to_row(race, 1)?;
        self.with_conn(move |conn| {
            let inserted: RaceRow = diesel::insert_into(races::table)
                .values(&row)
                .returning(RaceRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("insert_race"))?;
            row_to_race(inserted)
        })
        .await
    }

    async fn get_race(&self, id: RaceId) -> RepositoryResult<Option<Race>> {
        self.with_conn(move |conn| {
            races::table
                .filter(races::id.eq(id.to_string()))
                .select(RaceRow::as_select())
                .first::<RaceRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(row_to_race)
                .transpose()
        })
        .await
    }

    async fn find_races(&self, filter: &RaceFilter) -> RepositoryResult<Vec<Race>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut query = races::table.select(RaceRow::as_select()).into_boxed();
            if let Some(name) = &filter.name {
                query = query.filter(races::name.eq(name.clone()));
            }
            if let Some(user_id) = filter.racer_id {
                query = query.filter(
                    races::document.contains(json!({ "racers": [{ "userId": user_id }] })),
                );
            }
            if let Some(username) = &filter.racer_username {
                query = query.filter(
                    races::document.contains(json!({ "racers": [{ "username": username }] })),
                );
            }
            query
                .order((races::created_at.asc(), races::id.asc()))
                .load::<RaceRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(row_to_race)
                .collect()
        })
        .await
    }

    async fn replace_race(&self, race: &Race) -> RepositoryResult<Option<Race>> {
        let expected = race.revision as i64;
        let row = race_to_row(race, expected + 1)?;
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let updated = diesel::update(
                    races::table
                        .filter(races::id.eq(&row.id))
                        .filter(races::revision.eq(expected)),
                )
                .set((
                    races::name.eq(&row.name),
                    races::revision.eq(row.revision),
                    races::document.eq(&row.document),
                ))
                .returning(RaceRow::as_returning())
                .get_result::<RaceRow>(tx)
                .optional()
                .map_err(map_diesel_error)?;

                if let Some(updated) = updated {
                    return row_to_race(updated).map(Some);
                }

                let current: Option<i64> = races::table
                    .filter(races::id.eq(&row.id))
                    .select(races::revision)
                    .first(tx)
                    .optional()
                    .map_err(map_diesel_error)?;

                match current {
                    None => Ok(None),
                    Some(found) => Err(RepositoryError::revision_conflict(
                        format!("expected revision {}, found {}", expected, found),
                        ErrorContext::new("replace_race")
                            .with_entity("race")
                            .with_entity_id(&row.id),
                    )),
                }
            })
        })
        .await
    }

    async fn delete_race(&self, id: RaceId) -> RepositoryResult<Option<Race>> {
        self.with_conn(move |conn| {
            diesel::delete(races::table.filter(races::id.eq(id.to_string())))
                .returning(RaceRow::as_returning())
                .get_result::<RaceRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(row_to_race)
                .transpose()
        })
        .await
    }
}

#[async_trait]
impl FullRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }
}
