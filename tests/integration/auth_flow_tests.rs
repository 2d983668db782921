// ====================================
// tests/integration/auth_flow_tests.rs
// ====================================
//! Session lifecycle through the controller and the in-memory provider
use crate::test_utils::{setup_test_env, wait_for_state};
use starterkit_common::AuthEvent;
use starterkit_lib::auth::{
    AuthStateReader, IdentityProvider, OutboxKind, ProviderOp, SessionStatus,
    RESET_EMAIL_SENT_MESSAGE,
};
use starterkit_lib::error::{AuthError, ProviderError};

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "Password1";

#[tokio::test]
async fn test_duplicate_sign_up_stays_anonymous() {
    let (auth, provider) = setup_test_env(false).await;
    auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap();
    assert!(auth.sign_out().await.is_none());

    let err = auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap_err();
    assert!(matches!(err, AuthError::Provider(_)));
    assert_eq!(err.to_string(), "User already registered");
    assert_eq!(err.provider_code(), Some("user_already_exists"));

    let state = auth.snapshot();
    assert_eq!(state.status, SessionStatus::Anonymous);
    assert!(state.session.is_none());
    assert_eq!(provider.account_count(), 1);
}

#[tokio::test]
async fn test_pending_verification_then_confirmation() {
    let (auth, provider) = setup_test_env(true).await;
    let _subscription = auth.start();

    let outcome = auth.sign_up(EMAIL, PASSWORD, "Ada Lovelace").await.unwrap();
    assert!(outcome.needs_verification);
    assert_eq!(
        auth.snapshot().status,
        SessionStatus::PendingVerification {
            email: EMAIL.to_string()
        }
    );

    // signing in before confirming is refused by the provider
    let err = auth.sign_in(EMAIL, PASSWORD).await.unwrap_err();
    assert_eq!(err.provider_code(), Some("email_not_confirmed"));

    auth.resend_verification_email(EMAIL).await.unwrap();
    let outbox = provider.outbox().await;
    assert_eq!(outbox.len(), 2);
    assert!(outbox.iter().all(|m| m.kind == OutboxKind::Verification));

    provider.confirm_email(EMAIL).await.unwrap();
    let state = wait_for_state(&auth, |s| {
        s.status == SessionStatus::Active && s.profile.is_some()
    })
    .await;
    assert_eq!(state.profile.unwrap().full_name, "Ada Lovelace");
    assert!(state.user.unwrap().email_confirmed_at.is_some());
}

#[tokio::test]
async fn test_sign_in_and_out() {
    let (auth, _provider) = setup_test_env(false).await;
    auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap();
    auth.sign_out().await;

    let err = auth.sign_in(EMAIL, "Password2").await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid login credentials");
    assert!(!auth.is_authenticated());

    auth.sign_in("ADA@example.com", PASSWORD).await.unwrap();
    let state = auth.snapshot();
    assert_eq!(state.status, SessionStatus::Active);
    assert_eq!(state.profile.as_ref().map(|p| p.full_name.as_str()), Some("Ada"));

    assert!(auth.sign_out().await.is_none());
    let state = auth.snapshot();
    assert_eq!(state.status, SessionStatus::Anonymous);
    assert!(state.user.is_none() && state.profile.is_none());
}

#[tokio::test]
async fn test_session_expiry_signs_out() {
    let (auth, provider) = setup_test_env(false).await;
    let _subscription = auth.start();
    auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap();
    assert!(auth.is_authenticated());

    provider.expire_session().await;
    let state = wait_for_state(&auth, |s| s.status == SessionStatus::Anonymous).await;
    assert!(state.profile.is_none());
    assert!(state.session.is_none());
}

#[tokio::test]
async fn test_token_refresh_replaces_session() {
    let (auth, provider) = setup_test_env(false).await;
    let subscription = auth.start();
    auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap();
    let before = auth.snapshot().session.unwrap().access_token;

    let refreshed = provider.refresh_session().await.unwrap();
    assert_ne!(refreshed.access_token, before);
    let state = wait_for_state(&auth, |s| {
        s.session.as_ref().map(|x| x.access_token.as_str()) == Some(refreshed.access_token.as_str())
    })
    .await;
    assert_eq!(state.status, SessionStatus::Active);
    assert!(state.profile.is_some());
    assert!(subscription.is_active());
    subscription.unsubscribe();
}

#[tokio::test]
async fn test_push_notification_without_listener() {
    let (auth, provider) = setup_test_env(false).await;
    auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap();

    let mut changes = provider.subscribe();
    provider.expire_session().await;
    let change = changes.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::SignedOut);

    // nothing listens, so the controller still holds the old session
    assert!(auth.is_authenticated());
    auth.handle_auth_change(change).await;
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn test_update_password() {
    let (auth, provider) = setup_test_env(false).await;
    let err = auth.update_password("Password2").await.unwrap_err();
    assert!(err.is_precondition());

    auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap();
    auth.update_password("Password2").await.unwrap();
    auth.sign_out().await;

    assert!(auth.sign_in(EMAIL, PASSWORD).await.is_err());
    auth.sign_in(EMAIL, "Password2").await.unwrap();

    provider.fail_next(ProviderOp::UpdateUser, ProviderError::new("Network error"));
    let err = auth.update_password("Password3").await.unwrap_err();
    assert_eq!(err.user_message(), "Network error");
    assert!(auth.is_authenticated());
}

#[tokio::test]
async fn test_reset_password_never_reveals_accounts() {
    let (auth, provider) = setup_test_env(false).await;
    auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap();

    assert!(auth.reset_password("ghost@example.com").await.is_ok());
    assert!(auth.reset_password(EMAIL).await.is_ok());
    assert!(!RESET_EMAIL_SENT_MESSAGE.is_empty());

    let outbox = provider.outbox().await;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].email, EMAIL);
    assert_eq!(
        outbox[0].kind,
        OutboxKind::PasswordReset {
            redirect_url: "http://localhost:3000/reset-password".to_string()
        }
    );
}

#[tokio::test]
async fn test_sign_out_failure_is_reported_not_blocking() {
    let (auth, provider) = setup_test_env(false).await;
    auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap();

    provider.fail_next(ProviderOp::SignOut, ProviderError::new("Network error"));
    let failure = auth.sign_out().await.unwrap();
    assert_eq!(failure.user_message(), "Network error");
    assert_eq!(auth.snapshot().status, SessionStatus::Anonymous);
}

#[tokio::test]
async fn test_recovery_link_allows_new_password() {
    let (auth, provider) = setup_test_env(false).await;
    let _subscription = auth.start();
    auth.sign_up(EMAIL, PASSWORD, "Ada").await.unwrap();
    auth.sign_out().await;

    auth.reset_password(EMAIL).await.unwrap();
    let mut changes = provider.subscribe();
    let recovery = provider.open_recovery_link(EMAIL).await.unwrap();
    assert_eq!(changes.recv().await.unwrap().event, AuthEvent::PasswordRecovery);

    // earlier events are handled first, so this is the recovery session
    wait_for_state(&auth, |s| {
        s.session.as_ref().map(|x| x.access_token.as_str()) == Some(recovery.access_token.as_str())
    })
    .await;
    auth.update_password("Password2").await.unwrap();
    auth.sign_out().await;
    auth.sign_in(EMAIL, "Password2").await.unwrap();
}
