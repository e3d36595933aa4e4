//! Authentication lifecycle: registration, login, token rotation, logout,
//! password reset, verification trust credits.

mod common;

use common::{citizen, env, reload};

use byaboneka_core::error::DomainError;
use byaboneka_service::auth::RegisterRequest;

#[tokio::test]
async fn test_register_validates_fields() {
    let env = env();

    let bad = env
        .auth
        .register(RegisterRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            display_name: "".into(),
            phone: Some("abc".into()),
        })
        .await;

    match bad {
        Err(DomainError::InvalidInput { errors, .. }) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert!(fields.contains(&"email"));
            assert!(fields.contains(&"password"));
            assert!(fields.contains(&"display_name"));
            assert!(fields.contains(&"phone"));
        }
        other => panic!("expected field errors, got {:?}", other.map(|u| u.id)),
    }
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let env = env();
    citizen(&env, "dupe").await;

    let second = env
        .auth
        .register(RegisterRequest {
            email: "dupe@test.rw".into(),
            password: "passw0rd123".into(),
            display_name: "Dupe".into(),
            phone: None,
        })
        .await;
    assert!(matches!(second, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn test_login_and_authenticate() {
    let env = env();
    let actor = citizen(&env, "login").await;

    let (_user, pair) = env
        .auth
        .login("login@test.rw", "passw0rd123", None)
        .await
        .unwrap();

    let authed = env.auth.authenticate(&pair.access_token).await.unwrap();
    assert_eq!(authed.id, actor.id());

    // Wrong password and unknown email both collapse to Unauthenticated.
    assert!(matches!(
        env.auth.login("login@test.rw", "wrongpass1", None).await,
        Err(DomainError::Unauthenticated)
    ));
    assert!(matches!(
        env.auth.login("ghost@test.rw", "passw0rd123", None).await,
        Err(DomainError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_refresh_rotation_and_reuse_detection() {
    let env = env();
    citizen(&env, "rotate").await;

    let (_user, first) = env
        .auth
        .login("rotate@test.rw", "passw0rd123", None)
        .await
        .unwrap();

    // Rotation: the new pair works, the old refresh token is dead.
    let second = env.auth.refresh(&first.refresh_token).await.unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);

    let replay = env.auth.refresh(&first.refresh_token).await;
    assert!(matches!(replay, Err(DomainError::Unauthenticated)));

    // Replaying the rotated token burned the family: the fresh one is dead
    // too, and the user has to log in again.
    let after_burn = env.auth.refresh(&second.refresh_token).await;
    assert!(matches!(after_burn, Err(DomainError::Unauthenticated)));
}

#[tokio::test]
async fn test_logout_revokes_refresh() {
    let env = env();
    citizen(&env, "logout").await;

    let (_user, pair) = env
        .auth
        .login("logout@test.rw", "passw0rd123", None)
        .await
        .unwrap();
    env.auth.logout(&pair.refresh_token).await.unwrap();

    assert!(matches!(
        env.auth.refresh(&pair.refresh_token).await,
        Err(DomainError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_password_reset_flow() {
    let env = env();
    let actor = citizen(&env, "reset").await;

    env.auth.forgot_password("reset@test.rw").await.unwrap();
    let token = env
        .notifier
        .reset_tokens
        .lock()
        .unwrap()
        .last()
        .cloned()
        .expect("reset token should have been issued");

    env.auth
        .reset_password(&token, "newpassw0rd9")
        .await
        .unwrap();

    // Old password dead, new password works.
    assert!(env
        .auth
        .login("reset@test.rw", "passw0rd123", None)
        .await
        .is_err());
    let (user, _pair) = env
        .auth
        .login("reset@test.rw", "newpassw0rd9", None)
        .await
        .unwrap();
    assert_eq!(user.id, actor.id());

    // Tokens are single-use.
    assert!(env.auth.reset_password(&token, "anotherpw123").await.is_err());
}

#[tokio::test]
async fn test_forgot_password_does_not_leak_accounts() {
    let env = env();
    // Unknown email: same Ok(()), no token issued.
    env.auth.forgot_password("nobody@test.rw").await.unwrap();
    assert!(env.notifier.reset_tokens.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_verification_credits_trust_once() {
    let env = env();
    let actor = citizen(&env, "verify").await;

    env.auth.confirm_email(actor.id()).await.unwrap();
    env.auth.confirm_email(actor.id()).await.unwrap(); // idempotent
    env.auth.confirm_phone(actor.id()).await.unwrap();

    let user = reload(&env, &actor).await.user;
    assert!(user.email_verified);
    assert!(user.phone_verified);
    // +1 email, +2 phone, once each.
    assert_eq!(user.trust_score, 3);
}
