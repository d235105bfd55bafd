//! Self-service credential recovery.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::error;

use crate::account::store::RedeemOutcome;
use crate::account::{normalize_email, valid_email, validate_secret_change};
use crate::auth::error::AuthError;
use crate::auth::mailer::{build_recovery_url, RecoveryEmail};
use crate::auth::now_unix;
use crate::auth::recovery;
use crate::auth::state::AuthState;

use super::types::{AccountResponse, CompleteRecoveryRequest, RecoverRequest, TokenResponse};

/// Recovery requests are intentionally opaque: callers always get 204, so
/// the endpoint cannot be used to probe which emails have accounts.
#[utoipa::path(
    post,
    path = "/v1/auth/recover",
    request_body = RecoverRequest,
    responses((status = 204, description = "Recovery processed")),
    tag = "auth"
)]
pub async fn request_recovery(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RecoverRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return StatusCode::NO_CONTENT;
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return StatusCode::NO_CONTENT;
    }

    let account = match state.store().find_by_email(&email, false).await {
        Ok(Some(account)) => account,
        Ok(None) => return StatusCode::NO_CONTENT,
        Err(err) => {
            error!("Failed to look up account for recovery: {err}");
            return StatusCode::NO_CONTENT;
        }
    };

    let now = now_unix();
    let token = match recovery::issue(now, state.config().recovery_token_ttl_seconds()) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to mint recovery token: {err}");
            return StatusCode::NO_CONTENT;
        }
    };

    if let Err(err) = state
        .store()
        .set_recovery_token(account.id, &token.hash, token.expires_at)
        .await
    {
        error!("Failed to persist recovery token: {err}");
        return StatusCode::NO_CONTENT;
    }

    let message = RecoveryEmail {
        to_email: account.email.clone(),
        recovery_url: build_recovery_url(state.config().frontend_base_url(), &token.raw),
        expires_at: token.expires_at,
    };
    if let Err(err) = state.mailer().send(&message).await {
        error!("Failed to deliver recovery email: {err}");
        // An undeliverable token must not stay outstanding.
        if let Err(err) = state.store().clear_recovery_token(account.id).await {
            error!("Failed to clear recovery token after delivery failure: {err}");
        }
    }

    StatusCode::NO_CONTENT
}

#[utoipa::path(
    post,
    path = "/v1/auth/recover/complete",
    request_body = CompleteRecoveryRequest,
    responses(
        (status = 200, description = "Secret reset, fresh token minted", body = TokenResponse),
        (status = 400, description = "Invalid or expired recovery token")
    ),
    tag = "auth"
)]
pub async fn complete_recovery(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<CompleteRecoveryRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::validation("Missing payload"));
    };

    validate_secret_change(
        request.password.expose_secret(),
        request.password_confirm.expose_secret(),
    )
    .map_err(AuthError::Validation)?;

    let email = normalize_email(&request.email);
    let now = now_unix();

    // An unknown email reports the same mismatch as a wrong token, so this
    // endpoint does not leak account existence either.
    let Some(account) = state.store().find_by_email(&email, false).await? else {
        return Err(AuthError::RecoveryMismatch);
    };

    // Cheap pre-check before paying for the slow hash; the conditional
    // redemption below re-checks atomically.
    recovery::check(&request.token, &account, now)?;

    let secret_hash = state.secrets().hash_offloaded(request.password).await?;
    let outcome = state
        .store()
        .redeem_recovery(
            account.id,
            &recovery::hash_token(&request.token),
            &secret_hash,
            now,
        )
        .await?;
    if outcome == RedeemOutcome::AlreadyCleared {
        // A concurrent redemption won the conditional update.
        return Err(AuthError::RecoveryMismatch);
    }

    let token = state
        .signer()
        .issue(account.id, now)
        .map_err(AuthError::internal)?;

    Ok((
        StatusCode::OK,
        Json(TokenResponse {
            token,
            account: AccountResponse::from(&account),
        }),
    ))
}
