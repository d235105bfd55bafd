use secrecy::SecretString;
use std::sync::Arc;
use uuid::Uuid;

use crate::account::store::{AccountStore, MemoryAccountStore, RedeemOutcome};
use crate::account::{Account, NewAccount, Role};
use crate::auth::config::AuthConfig;
use crate::auth::error::AuthError;
use crate::auth::gate::{authorize_role, evaluate_session, Principal};
use crate::auth::mailer::LogRecoveryMailer;
use crate::auth::recovery;
use crate::auth::secret::SecretStore;
use crate::auth::state::AuthState;
use crate::auth::token::SessionSigner;

const KEY: &str = "0123456789abcdef0123456789abcdef";
const T0: i64 = 1_700_000_000;

fn state_with_skew(skew_seconds: i64) -> (Arc<AuthState>, Arc<MemoryAccountStore>) {
    let config = AuthConfig::new("http://localhost:3000".to_string())
        .with_credential_grace_skew_seconds(skew_seconds);
    let store = Arc::new(MemoryAccountStore::new());
    let signer = SessionSigner::new(
        SecretString::from(KEY.to_string()),
        config.session_token_ttl_seconds(),
    )
    .unwrap();
    let state = AuthState::new(
        config,
        SecretStore::new(),
        signer,
        store.clone(),
        Arc::new(LogRecoveryMailer),
    );
    (Arc::new(state), store)
}

async fn seeded_account(store: &MemoryAccountStore) -> Account {
    store
        .insert(NewAccount {
            name: "Anna".to_string(),
            email: "anna@example.com".to_string(),
            role: Role::User,
            secret_hash: "$argon2id$stub".to_string(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_gate_accepts_live_session() {
    let (state, store) = state_with_skew(0);
    let account = seeded_account(&store).await;
    let token = state.signer().issue(account.id, T0).unwrap();

    let principal = evaluate_session(&state, &token, T0 + 5).await.unwrap();
    assert_eq!(principal.account_id, account.id);
    assert_eq!(principal.email, "anna@example.com");
    assert_eq!(principal.role, Role::User);
}

#[tokio::test]
async fn test_gate_rejects_garbage_token() {
    let (state, _store) = state_with_skew(0);
    let result = evaluate_session(&state, "not-a-token", T0).await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn test_gate_rejects_expired_token() {
    let (state, store) = state_with_skew(0);
    let account = seeded_account(&store).await;
    let token = state.signer().issue(account.id, T0).unwrap();

    let after_expiry = T0 + state.config().session_token_ttl_seconds();
    let result = evaluate_session(&state, &token, after_expiry).await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn test_gate_rejects_unknown_subject() {
    let (state, _store) = state_with_skew(0);
    let token = state.signer().issue(Uuid::new_v4(), T0).unwrap();
    let result = evaluate_session(&state, &token, T0 + 1).await;
    assert!(matches!(result, Err(AuthError::AccountNotFound)));
}

#[tokio::test]
async fn test_gate_rejects_inactive_account() {
    let (state, store) = state_with_skew(0);
    let account = seeded_account(&store).await;
    let token = state.signer().issue(account.id, T0).unwrap();

    store.deactivate(account.id).await.unwrap();

    let result = evaluate_session(&state, &token, T0 + 1).await;
    assert!(matches!(result, Err(AuthError::AccountInactive)));
}

#[tokio::test]
async fn test_tight_skew_rejects_token_minted_before_change() {
    let (state, store) = state_with_skew(0);
    let account = seeded_account(&store).await;
    let token = state.signer().issue(account.id, T0).unwrap();

    store
        .update_secret(account.id, "$argon2id$rotated", T0 + 1)
        .await
        .unwrap();

    let result = evaluate_session(&state, &token, T0 + 2).await;
    assert!(matches!(result, Err(AuthError::StaleCredential)));
}

#[tokio::test]
async fn test_default_skew_tolerates_stamp_write_lag() {
    let (state, store) = state_with_skew(super::config::DEFAULT_CREDENTIAL_GRACE_SKEW_SECONDS);
    let account = seeded_account(&store).await;
    let token = state.signer().issue(account.id, T0).unwrap();

    store
        .update_secret(account.id, "$argon2id$rotated", T0 + 1)
        .await
        .unwrap();

    assert!(evaluate_session(&state, &token, T0 + 2).await.is_ok());
}

#[tokio::test]
async fn test_skew_boundary_is_inclusive() {
    let (state, store) = state_with_skew(60);
    let account = seeded_account(&store).await;
    let token = state.signer().issue(account.id, T0).unwrap();

    store
        .update_secret(account.id, "$argon2id$rotated", T0 + 60)
        .await
        .unwrap();
    assert!(evaluate_session(&state, &token, T0 + 61).await.is_ok());

    store
        .update_secret(account.id, "$argon2id$rotated", T0 + 61)
        .await
        .unwrap();
    let result = evaluate_session(&state, &token, T0 + 62).await;
    assert!(matches!(result, Err(AuthError::StaleCredential)));
}

#[tokio::test]
async fn test_account_without_change_stamp_is_fresh() {
    let (state, store) = state_with_skew(0);
    let account = seeded_account(&store).await;
    // Tokens minted long before "now" stay valid while no credential
    // change is on record.
    let token = state.signer().issue(account.id, T0 - 3_600).unwrap();
    assert!(evaluate_session(&state, &token, T0).await.is_ok());
}

#[test]
fn test_role_gate() {
    let principal = Principal {
        account_id: Uuid::new_v4(),
        name: "Anna".to_string(),
        email: "anna@example.com".to_string(),
        role: Role::User,
    };
    assert!(authorize_role(&principal, &[Role::User]).is_ok());
    assert!(authorize_role(&principal, &[Role::User, Role::Admin]).is_ok());
    assert!(matches!(
        authorize_role(&principal, &[Role::Admin]),
        Err(AuthError::Forbidden)
    ));
    assert!(matches!(
        authorize_role(&principal, &[]),
        Err(AuthError::Forbidden)
    ));
}

#[tokio::test]
async fn test_recovery_token_is_single_use() {
    let (state, store) = state_with_skew(0);
    let account = seeded_account(&store).await;

    let ttl = state.config().recovery_token_ttl_seconds();
    let token = recovery::issue(T0, ttl).unwrap();
    store
        .set_recovery_token(account.id, &token.hash, token.expires_at)
        .await
        .unwrap();

    let fetched = store
        .find_by_id(account.id, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(recovery::check(&token.raw, &fetched, T0 + 10), Ok(()));

    let first = store
        .redeem_recovery(account.id, &token.hash, "$argon2id$fresh", T0 + 10)
        .await
        .unwrap();
    assert_eq!(first, RedeemOutcome::Redeemed);

    let second = store
        .redeem_recovery(account.id, &token.hash, "$argon2id$fresher", T0 + 11)
        .await
        .unwrap();
    assert_eq!(second, RedeemOutcome::AlreadyCleared);

    let fetched = store
        .find_by_id(account.id, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        recovery::check(&token.raw, &fetched, T0 + 12),
        Err(recovery::RecoveryError::Mismatch)
    );
}

#[tokio::test]
async fn test_recovery_token_expires() {
    let (state, store) = state_with_skew(0);
    let account = seeded_account(&store).await;

    let ttl = state.config().recovery_token_ttl_seconds();
    let token = recovery::issue(T0, ttl).unwrap();
    store
        .set_recovery_token(account.id, &token.hash, token.expires_at)
        .await
        .unwrap();

    let fetched = store
        .find_by_id(account.id, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        recovery::check(&token.raw, &fetched, token.expires_at + 1),
        Err(recovery::RecoveryError::Expired)
    );

    let outcome = store
        .redeem_recovery(
            account.id,
            &token.hash,
            "$argon2id$fresh",
            token.expires_at + 1,
        )
        .await
        .unwrap();
    assert_eq!(outcome, RedeemOutcome::AlreadyCleared);
}
