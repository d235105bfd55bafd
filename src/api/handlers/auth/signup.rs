//! Account creation.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::account::{normalize_email, validate_signup, NewAccount, Role, SignupCandidate};
use crate::auth::error::AuthError;
use crate::auth::now_unix;
use crate::auth::state::AuthState;

use super::types::{AccountResponse, SignupRequest, TokenResponse};

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email is already registered")
    ),
    tag = "auth"
)]
pub async fn signup(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::validation("Missing payload"));
    };

    let email = normalize_email(&request.email);
    let candidate = SignupCandidate {
        name: &request.name,
        email: &email,
        secret: request.password.expose_secret(),
        secret_confirm: request.password_confirm.expose_secret(),
    };
    validate_signup(&candidate).map_err(AuthError::Validation)?;

    // Hash first, then build the insert payload; the plaintext pair never
    // leaves this scope.
    let secret_hash = state.secrets().hash_offloaded(request.password).await?;
    let account = state
        .store()
        .insert(NewAccount {
            name: request.name.trim().to_string(),
            email,
            role: Role::User,
            secret_hash,
        })
        .await?;

    let token = state
        .signer()
        .issue(account.id, now_unix())
        .map_err(AuthError::internal)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            token,
            account: AccountResponse::from(&account),
        }),
    ))
}
