//! Secret change for an authenticated session.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::account::validate_secret_change;
use crate::auth::error::AuthError;
use crate::auth::gate::Principal;
use crate::auth::now_unix;
use crate::auth::state::AuthState;

use super::types::{AccountResponse, ChangePasswordRequest, TokenResponse};

#[utoipa::path(
    post,
    path = "/v1/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Secret changed, fresh token minted", body = TokenResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn change_password(
    Extension(principal): Extension<Principal>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::validation("Missing payload"));
    };

    validate_secret_change(
        request.password.expose_secret(),
        request.password_confirm.expose_secret(),
    )
    .map_err(AuthError::Validation)?;

    // The gate ran moments ago, but the account can vanish or deactivate
    // in between.
    let account = state
        .store()
        .find_by_id(principal.account_id, false)
        .await?
        .ok_or(AuthError::AccountNotFound)?;

    if !state
        .secrets()
        .verify_offloaded(request.password_current, account.secret_hash.clone())
        .await
    {
        return Err(AuthError::BadCredentials);
    }

    let changed_at = now_unix();
    let secret_hash = state.secrets().hash_offloaded(request.password).await?;
    state
        .store()
        .update_secret(account.id, &secret_hash, changed_at)
        .await?;

    // The fresh token carries the same instant the change was stamped
    // with, so it sits inside the freshness window by construction.
    let token = state
        .signer()
        .issue(account.id, changed_at)
        .map_err(AuthError::internal)?;

    Ok((
        StatusCode::OK,
        Json(TokenResponse {
            token,
            account: AccountResponse::from(&account),
        }),
    ))
}
