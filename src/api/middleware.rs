//! Session and role gates, composed as router middleware.
//!
//! `require_session` runs first and attaches a [`Principal`] to the
//! request; `restrict_to_admin` layers on top of it and only ever sees
//! requests that already cleared the session gate.

use axum::extract::{Extension, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::error;

use crate::account::Role;
use crate::auth::error::AuthError;
use crate::auth::gate::{authorize_role, evaluate_session, Principal};
use crate::auth::now_unix;
use crate::auth::state::AuthState;

/// Extract the bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Gate a route behind a valid session.
pub async fn require_session(
    Extension(state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return AuthError::InvalidToken.into_response();
    };

    match evaluate_session(&state, &token, now_unix()).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Gate a route behind the admin role. Must be layered under
/// [`require_session`].
pub async fn restrict_to_admin(request: Request, next: Next) -> Response {
    restrict_to(request, next, &[Role::Admin]).await
}

async fn restrict_to(request: Request, next: Next, required: &[Role]) -> Response {
    let Some(principal) = request.extensions().get::<Principal>() else {
        // The session gate always runs first; reaching this without a
        // principal is a wiring bug.
        error!("role gate reached without an authenticated principal");
        return AuthError::InvalidToken.into_response();
    };

    match authorize_role(principal, required) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}
