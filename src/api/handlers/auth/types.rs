//! Request and response bodies for the authentication endpoints.
//!
//! Requests that carry secrets hold them as [`SecretString`] and only
//! derive `Deserialize`, so a stray debug or serialize never leaks a
//! plaintext.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::account::{Account, Role};

#[derive(ToSchema, Deserialize, Debug)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
    #[schema(value_type = String, format = Password)]
    pub password_confirm: SecretString,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RecoverRequest {
    pub email: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct CompleteRecoveryRequest {
    pub token: String,
    pub email: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
    #[schema(value_type = String, format = Password)]
    pub password_confirm: SecretString,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    #[schema(value_type = String, format = Password)]
    pub password_current: SecretString,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
    #[schema(value_type = String, format = Password)]
    pub password_confirm: SecretString,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}

/// Returned by every endpoint that mints a session token.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub token: String,
    pub account: AccountResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub account_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}
