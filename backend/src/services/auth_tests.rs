use super::*;
use crate::db::LocalRepository;
use crate::services::MIN_BCRYPT_COST;
use chrono::Duration;

fn service() -> AuthService {
    AuthService::new(
        Arc::new(LocalRepository::new()),
        PasswordHasher::new(MIN_BCRYPT_COST),
        TokenIssuer::new(b"test-secret", Duration::hours(8)),
    )
}

fn registration(username: &str, password: &str, role: Role) -> Registration {
    Registration {
        username: username.to_string(),
        password: password.to_string(),
        role,
    }
}

async fn admin_claims(auth: &AuthService) -> Claims {
    auth.register(registration("root", "rootpw", Role::Admin))
        .await
        .unwrap();
    let outcome = auth.login("root", "rootpw").await.unwrap();
    auth.verify(Some(&outcome.token)).unwrap()
}

#[tokio::test]
async fn test_register_then_login() {
    let auth = service();
    let id = auth
        .register(registration("alice", "pw1", Role::User))
        .await
        .unwrap();

    let outcome = auth.login("alice", "pw1").await.unwrap();
    assert_eq!(outcome.user.id, id);
    assert_eq!(outcome.user.role, Role::User);

    let claims = auth.verify(Some(&outcome.token)).unwrap();
    assert_eq!(claims.username, "alice");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let auth = service();
    auth.register(registration("alice", "pw1", Role::User))
        .await
        .unwrap();

    let wrong = auth.login("alice", "wrong").await.unwrap_err();
    let missing = auth.login("nobody", "pw1").await.unwrap_err();
    assert!(matches!(wrong, ServiceError::InvalidCredentials));
    assert!(matches!(missing, ServiceError::InvalidCredentials));
    assert_eq!(wrong.to_string(), "Invalid username or password");
}

#[tokio::test]
async fn test_duplicate_username_is_a_conflict() {
    let auth = service();
    auth.register(registration("alice", "pw1", Role::User))
        .await
        .unwrap();
    let err = auth
        .register(registration("alice", "pw2", Role::User))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Username already exists"));
}

#[tokio::test]
async fn test_blank_username_is_invalid_input() {
    let auth = service();
    let err = auth
        .register(registration("   ", "pw", Role::User))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn test_verify_distinguishes_missing_from_invalid() {
    let auth = service();
    assert!(matches!(
        auth.verify(None),
        Err(ServiceError::Unauthenticated)
    ));
    assert!(matches!(
        auth.verify(Some("  ")),
        Err(ServiceError::Unauthenticated)
    ));
    assert!(matches!(
        auth.verify(Some("garbage")),
        Err(ServiceError::InvalidCredential)
    ));
}

#[tokio::test]
async fn test_update_profile_rehashes_password() {
    let auth = service();
    let id = auth
        .register(registration("alice", "pw1", Role::User))
        .await
        .unwrap();

    let profile = auth
        .update_profile(
            id,
            UserUpdate {
                username: Some("alice2".to_string()),
                password: Some("pw2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(profile.username, "alice2");
    assert_eq!(profile.role, Role::User);

    assert!(auth.login("alice2", "pw1").await.is_err());
    assert!(auth.login("alice2", "pw2").await.is_ok());
}

#[tokio::test]
async fn test_update_profile_rejects_taken_username() {
    let auth = service();
    auth.register(registration("alice", "pw", Role::User))
        .await
        .unwrap();
    let bob = auth
        .register(registration("bob", "pw", Role::User))
        .await
        .unwrap();

    let err = auth
        .update_profile(
            bob,
            UserUpdate {
                username: Some("alice".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_update_profile_missing_user() {
    let auth = service();
    let err = auth
        .update_profile(UserId::generate(), UserUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref m) if m == "User not found"));
}

#[tokio::test]
async fn test_admin_operations_require_admin() {
    let auth = service();
    let admin = admin_claims(&auth).await;
    let alice = auth
        .register(registration("alice", "pw", Role::User))
        .await
        .unwrap();
    let token = auth.login("alice", "pw").await.unwrap().token;
    let user_claims = auth.verify(Some(&token)).unwrap();

    assert!(matches!(
        auth.list_users(&user_claims).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        auth.delete_user(&user_claims, &alice.to_string()).await,
        Err(ServiceError::Forbidden(_))
    ));

    assert_eq!(auth.list_users(&admin).await.unwrap().len(), 2);
    auth.delete_user(&admin, &alice.to_string()).await.unwrap();
    assert!(matches!(
        auth.delete_user(&admin, &alice.to_string()).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        auth.delete_user(&admin, "not-an-id").await,
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn test_require_role() {
    let claims = Claims {
        id: UserId::generate(),
        username: "u".to_string(),
        role: Role::User,
        iat: 0,
        exp: 0,
    };
    assert!(require_role(&claims, Role::User).is_ok());
    let err = require_role(&claims, Role::Admin).unwrap_err();
    assert_eq!(err.to_string(), "Access denied. Admin privileges required.");
}
