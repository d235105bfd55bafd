//! OpenAPI document assembly.

use utoipa::OpenApi;

use crate::api::handlers::{accounts, auth, health};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::signup::signup,
        auth::login::login,
        auth::recovery::request_recovery,
        auth::recovery::complete_recovery,
        auth::password::change_password,
        auth::session::session,
        auth::session::deactivate,
        accounts::list,
    ),
    components(schemas(
        crate::account::Role,
        auth::types::SignupRequest,
        auth::types::LoginRequest,
        auth::types::RecoverRequest,
        auth::types::CompleteRecoveryRequest,
        auth::types::ChangePasswordRequest,
        auth::types::AccountResponse,
        auth::types::TokenResponse,
        auth::types::SessionResponse,
        accounts::AccountSummary,
        health::Health,
    )),
    tags(
        (name = "auth", description = "Authentication, sessions, and recovery"),
        (name = "accounts", description = "Administrative account views"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/health",
            "/v1/auth/signup",
            "/v1/auth/login",
            "/v1/auth/recover",
            "/v1/auth/recover/complete",
            "/v1/auth/password",
            "/v1/auth/session",
            "/v1/auth/account",
            "/v1/accounts",
        ] {
            assert!(
                paths.iter().any(|path| *path == expected),
                "missing path: {expected}"
            );
        }
    }
}
