//! Session validity gate.
//!
//! A presented token passes through signature verification, account
//! resolution, and a credential-freshness check before a [`Principal`]
//! comes out the other side. Role checks compose on top and never run for
//! a session that has not cleared all three.

use tracing::debug;
use uuid::Uuid;

use crate::account::Role;

use super::error::AuthError;
use super::state::AuthState;

/// Identity attached to a request once its session cleared every check.
#[derive(Clone, Debug)]
pub struct Principal {
    pub account_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Evaluate a presented session token against the current account state.
///
/// # Errors
///
/// `InvalidToken` for anything structurally wrong, forged, or expired;
/// `AccountNotFound` / `AccountInactive` when the subject cannot carry a
/// session; `StaleCredential` when the token was minted before the last
/// credential change, beyond the configured grace skew. A store failure
/// surfaces as `Internal`.
pub async fn evaluate_session(
    state: &AuthState,
    token: &str,
    now: i64,
) -> Result<Principal, AuthError> {
    let claims = state.signer().verify(token, now).map_err(|err| {
        debug!("session token rejected: {err}");
        AuthError::InvalidToken
    })?;

    // Inactive must stay distinguishable from missing in the logs, so this
    // lookup overrides the default active-only filter and checks the flag
    // itself.
    let account = state
        .store()
        .find_by_id(claims.sub, true)
        .await?
        .ok_or(AuthError::AccountNotFound)?;
    if !account.active {
        return Err(AuthError::AccountInactive);
    }

    if let Some(changed_at) = account.credential_changed_at {
        // The change timestamp can land shortly after a legitimate mint;
        // the grace skew covers that write lag without keeping genuinely
        // pre-change tokens alive.
        if claims.iat + state.config().credential_grace_skew_seconds() < changed_at {
            return Err(AuthError::StaleCredential);
        }
    }

    Ok(Principal {
        account_id: account.id,
        name: account.name,
        email: account.email,
        role: account.role,
    })
}

/// Role-membership check for the composed authorization gate.
///
/// # Errors
///
/// `Forbidden` when the principal's role is not in `required`.
pub fn authorize_role(principal: &Principal, required: &[Role]) -> Result<(), AuthError> {
    if required.contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
