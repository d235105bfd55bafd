//! Session introspection and account deactivation.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::auth::error::AuthError;
use crate::auth::gate::Principal;
use crate::auth::state::AuthState;

use super::types::SessionResponse;

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is live", body = SessionResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn session(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(SessionResponse {
        account_id: principal.account_id.to_string(),
        name: principal.name,
        email: principal.email,
        role: principal.role,
    })
}

#[utoipa::path(
    delete,
    path = "/v1/auth/account",
    responses(
        (status = 204, description = "Account deactivated"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn deactivate(
    Extension(principal): Extension<Principal>,
    state: Extension<Arc<AuthState>>,
) -> Result<StatusCode, AuthError> {
    state.store().deactivate(principal.account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
