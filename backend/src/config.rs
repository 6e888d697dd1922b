//! Runtime configuration read from the environment.
//!
//! | Variable                 | Default          |
//! |--------------------------|------------------|
//! | `HOST`                   | `0.0.0.0`        |
//! | `PORT`                   | `3000`           |
//! | `JWT_SECRET`             | required         |
//! | `TOKEN_TTL_HOURS`        | `8`              |
//! | `BCRYPT_COST`            | bcrypt default   |
//! | `APP_ENV`                | `production`     |
//! | `RACE_MUTATION_ATTEMPTS` | `3`              |
//!
//! Storage selection lives with the repository factory (`REPOSITORY_TYPE`,
//! `DATABASE_URL`, `PG_*`).

use chrono::Duration;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::services::{DEFAULT_MUTATION_ATTEMPTS, MIN_BCRYPT_COST};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" | "" => Ok(Self::Production),
            _ => Err(()),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub environment: Environment,
    pub mutation_attempts: u32,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("environment", &self.environment)
            .field("mutation_attempts", &self.mutation_attempts)
            .finish()
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let ttl_hours: i64 = parse_or(&lookup, "TOKEN_TTL_HOURS", 8)?;
        if ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                var: "TOKEN_TTL_HOURS",
                value: ttl_hours.to_string(),
            });
        }

        let environment = match lookup("APP_ENV") {
            None => Environment::default(),
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "APP_ENV",
                value,
            })?,
        };

        Ok(Self {
            host: lookup("HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            jwt_secret,
            token_ttl: Duration::hours(ttl_hours),
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            environment,
            mutation_attempts: parse_or(
                &lookup,
                "RACE_MUTATION_ATTEMPTS",
                DEFAULT_MUTATION_ATTEMPTS,
            )?,
        })
    }

    /// Configuration for tests and embedding: development mode, minimal bcrypt cost.
    pub fn for_testing(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::hours(8),
            bcrypt_cost: MIN_BCRYPT_COST,
            environment: Environment::Development,
            mutation_attempts: DEFAULT_MUTATION_ATTEMPTS,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
