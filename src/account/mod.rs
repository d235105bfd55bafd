//! Account domain model and whole-record validation.
//!
//! Validation runs on the candidate record before any hashing or
//! persistence happens, so a rejected signup never costs a slow hash and
//! never leaves a partial row behind.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod postgres;
pub mod store;

/// Platform roles, least to most privileged.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Host,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Host => "host",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "host" => Ok(Self::Host),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A stored account. `secret_hash` is the salted slow hash of the long-term
/// secret; the plaintext never appears on this type.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub secret_hash: String,
    /// Unix seconds of the last secret change, `None` until the secret
    /// changes for the first time. Never moves backwards.
    pub credential_changed_at: Option<i64>,
    /// Fast hash of the outstanding recovery token. Present only together
    /// with `recovery_token_expires_at`.
    pub recovery_token_hash: Option<Vec<u8>>,
    pub recovery_token_expires_at: Option<i64>,
    pub active: bool,
}

/// Insert payload, constructed only after the secret has been hashed so the
/// plaintext and its confirmation never reach a store.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub secret_hash: String,
}

/// Candidate fields for account creation, validated as a whole.
#[derive(Clone, Copy, Debug)]
pub struct SignupCandidate<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub secret: &'a str,
    pub secret_confirm: &'a str,
}

/// Normalize an email for lookups and uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email shape check on already-normalized input.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// Validate a whole signup candidate, collecting every failing check
/// instead of stopping at the first one.
///
/// # Errors
///
/// Returns the list of validation messages when any field is rejected.
pub fn validate_signup(candidate: &SignupCandidate<'_>) -> Result<(), Vec<String>> {
    let mut issues = Vec::new();
    if candidate.name.trim().is_empty() {
        issues.push("Please tell us your name".to_string());
    }
    if !valid_email(candidate.email) {
        issues.push("Please provide a valid email".to_string());
    }
    issues.extend(secret_pair_issues(
        candidate.secret,
        candidate.secret_confirm,
    ));
    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Validate a new secret and its confirmation for the change and recovery
/// flows.
///
/// # Errors
///
/// Returns the list of validation messages when the pair is rejected.
pub fn validate_secret_change(secret: &str, secret_confirm: &str) -> Result<(), Vec<String>> {
    let issues = secret_pair_issues(secret, secret_confirm);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn secret_pair_issues(secret: &str, secret_confirm: &str) -> Vec<String> {
    let mut issues = Vec::new();
    if secret.is_empty() {
        issues.push("Please provide a password".to_string());
    }
    if secret != secret_confirm {
        issues.push("Passwords are not the same".to_string());
    }
    issues
}
