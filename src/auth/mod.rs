//! Credential and session security: secret hashing, single-use recovery
//! tokens, signed session tokens, and the validity gate that decides
//! whether a presented session is still trustworthy.

pub mod config;
pub mod error;
pub mod gate;
pub mod mailer;
pub mod recovery;
pub mod secret;
pub mod state;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use gate::{authorize_role, evaluate_session, Principal};
pub use secret::SecretStore;
pub use state::AuthState;
pub use token::SessionSigner;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
#[must_use]
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

#[cfg(test)]
mod tests;
