//! Tests for db::repository::error - context rendering and error classification.

use race_backend::db::repository::{ErrorContext, RepositoryError};

#[test]
fn test_error_context_builder_chain() {
    let ctx = ErrorContext::new("replace_race")
        .with_entity("race")
        .with_entity_id("42")
        .with_details("revision 3 expected")
        .retryable();

    assert_eq!(ctx.operation.as_deref(), Some("replace_race"));
    assert_eq!(ctx.entity.as_deref(), Some("race"));
    assert_eq!(ctx.entity_id.as_deref(), Some("42"));
    assert_eq!(ctx.details.as_deref(), Some("revision 3 expected"));
    assert!(ctx.retryable);
}

#[test]
fn test_error_context_display_lists_set_fields_only() {
    let ctx = ErrorContext::new("get_user").with_entity("user");
    assert_eq!(ctx.to_string(), "[operation=get_user, entity=user]");

    let empty = ErrorContext::default();
    assert_eq!(empty.to_string(), "[]");
}

#[test]
fn test_error_context_display_full() {
    let ctx = ErrorContext::new("insert_user")
        .with_entity("user")
        .with_entity_id("abc")
        .with_details("username taken")
        .retryable();
    assert_eq!(
        ctx.to_string(),
        "[operation=insert_user, entity=user, id=abc, details=username taken, retryable=true]"
    );
}

#[test]
fn test_connection_error_is_retryable() {
    let err = RepositoryError::connection("pool exhausted");
    assert!(err.is_retryable());
    assert!(err.to_string().starts_with("Connection error: pool exhausted"));
}

#[test]
fn test_query_error_without_retry_flag() {
    let err = RepositoryError::query("syntax error");
    assert!(!err.is_retryable());
}

#[test]
fn test_duplicate_key_classification() {
    let err = RepositoryError::duplicate_with_context(
        "username already exists",
        ErrorContext::new("insert_user").with_entity("user"),
    );
    assert!(err.is_duplicate_key());
    assert!(!err.is_revision_conflict());
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("entity=user"));
}

#[test]
fn test_revision_conflict_classification() {
    let err = RepositoryError::revision_conflict(
        "race changed",
        ErrorContext::new("replace_race").with_entity_id("r1"),
    );
    assert!(err.is_revision_conflict());
    assert!(!err.is_duplicate_key());
    // Conflicts are retried by the service with a fresh read, not by the pool.
    assert!(!err.is_retryable());
}

#[test]
fn test_with_operation_overrides_context() {
    let err = RepositoryError::internal("boom").with_operation("list_races");
    assert_eq!(err.context().operation.as_deref(), Some("list_races"));
    assert!(err.to_string().contains("operation=list_races"));
}

#[test]
fn test_configuration_error_display() {
    let err = RepositoryError::configuration("Unknown repository type: mongo");
    assert!(matches!(err, RepositoryError::ConfigurationError { .. }));
    assert!(err
        .to_string()
        .starts_with("Configuration error: Unknown repository type: mongo"));
}

#[test]
fn test_serde_json_error_converts() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: RepositoryError = json_err.into();
    assert!(!err.is_retryable());
}
