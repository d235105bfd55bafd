//! Administrative account views.

use axum::extract::{Extension, Query};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::account::{Account, Role};
use crate::auth::error::AuthError;
use crate::auth::state::AuthState;

#[derive(IntoParams, Deserialize, Debug)]
pub struct ListQuery {
    /// Include deactivated accounts in the listing.
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            active: account.active,
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/accounts",
    params(ListQuery),
    responses(
        (status = 200, description = "Accounts", body = [AccountSummary]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    ),
    tag = "accounts"
)]
pub async fn list(
    state: Extension<Arc<AuthState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AuthError> {
    let accounts = state.store().list(query.include_inactive).await?;
    let summaries: Vec<AccountSummary> = accounts.iter().map(AccountSummary::from).collect();
    Ok(Json(summaries))
}
