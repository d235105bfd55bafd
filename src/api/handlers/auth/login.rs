//! Email and secret authentication.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::account::normalize_email;
use crate::auth::error::AuthError;
use crate::auth::now_unix;
use crate::auth::state::AuthState;

use super::types::{AccountResponse, LoginRequest, TokenResponse};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = TokenResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::validation("Missing payload"));
    };

    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.expose_secret().is_empty() {
        return Err(AuthError::validation("Please provide email and password"));
    }

    // Identity-bearing lookup: deactivated accounts stay invisible here,
    // and an unknown email fails the same way as a wrong secret.
    let Some(account) = state.store().find_by_email(&email, false).await? else {
        return Err(AuthError::BadCredentials);
    };

    if !state
        .secrets()
        .verify_offloaded(request.password, account.secret_hash.clone())
        .await
    {
        return Err(AuthError::BadCredentials);
    }

    let token = state
        .signer()
        .issue(account.id, now_unix())
        .map_err(AuthError::internal)?;

    Ok((
        StatusCode::OK,
        Json(TokenResponse {
            token,
            account: AccountResponse::from(&account),
        }),
    ))
}
