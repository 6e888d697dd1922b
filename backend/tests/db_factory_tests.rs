//! Tests for db::factory module - repository creation and configuration.

mod support;

use std::io::Write;
use std::str::FromStr;

use race_backend::db::factory::{RepositoryFactory, RepositoryType};
use race_backend::db::{FullRepository, RepositoryConfig, RepositoryError};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[test]
fn test_repository_type_from_str_postgres() {
    for value in ["postgres", "POSTGRES", "postgresql", "pg"] {
        assert_eq!(
            RepositoryType::from_str(value).unwrap(),
            RepositoryType::Postgres
        );
    }
}

#[test]
fn test_repository_type_from_str_local() {
    for value in ["local", "LOCAL", "memory", "in-memory"] {
        assert_eq!(
            RepositoryType::from_str(value).unwrap(),
            RepositoryType::Local
        );
    }
}

#[test]
fn test_repository_type_from_str_invalid() {
    let result = RepositoryType::from_str("invalid");
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Unknown repository type"));
}

#[test]
fn test_repository_type_as_str_round_trips() {
    for rt in [RepositoryType::Local, RepositoryType::Postgres] {
        assert_eq!(RepositoryType::from_str(rt.as_str()).unwrap(), rt);
    }
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || {
            let rt = RepositoryType::from_env().unwrap();
            assert_eq!(rt, RepositoryType::Local);
        },
    );
}

#[test]
fn test_repository_type_from_env_with_database_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", Some("postgres://localhost/test")),
        ],
        || {
            let rt = RepositoryType::from_env().unwrap();
            assert_eq!(rt, RepositoryType::Postgres);
        },
    );
}

#[test]
fn test_repository_type_from_env_with_pg_database_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", Some("postgres://localhost/test")),
        ],
        || {
            let rt = RepositoryType::from_env().unwrap();
            assert_eq!(rt, RepositoryType::Postgres);
        },
    );
}

#[test]
fn test_repository_type_explicit_overrides_database_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("local")),
            ("DATABASE_URL", Some("postgres://localhost/test")),
        ],
        || {
            let rt = RepositoryType::from_env().unwrap();
            assert_eq!(rt, RepositoryType::Local);
        },
    );
}

#[test]
fn test_repository_type_from_env_invalid_value() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("mongo"))], || {
        let err = RepositoryType::from_env().unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationError { .. }));
    });
}

#[test]
fn test_factory_from_env_local() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("local"))], || {
        let repo = block_on(RepositoryFactory::from_env()).unwrap();
        assert!(block_on(repo.health_check()).unwrap());
    });
}

#[tokio::test]
async fn test_factory_create_postgres_requires_config() {
    let result = RepositoryFactory::create(RepositoryType::Postgres, None).await;
    assert!(matches!(
        result,
        Err(RepositoryError::ConfigurationError { .. })
    ));
}

#[tokio::test]
async fn test_factory_from_config_file_local() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"local\"").unwrap();

    let repo = RepositoryFactory::from_config_file(file.path())
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_factory_from_config_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let result = RepositoryFactory::from_config_file(dir.path().join("absent.toml")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_factory_from_config_file_rejects_unknown_type() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"cassandra\"").unwrap();

    let result = RepositoryFactory::from_config_file(file.path()).await;
    assert!(matches!(
        result,
        Err(RepositoryError::ConfigurationError { .. })
    ));
}

#[test]
fn test_repository_config_parse_local() {
    let config = RepositoryConfig::parse("[repository]\ntype = \"memory\"\n").unwrap();
    assert_eq!(config.repository_type().unwrap(), RepositoryType::Local);
    assert!(config.to_postgres_config().unwrap().is_none());
}
