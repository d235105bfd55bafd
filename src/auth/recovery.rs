//! Single-use recovery tokens.
//!
//! The raw token leaves the system through the delivery channel and is
//! never stored; only its fast hash and expiry live on the account. The
//! raw value already carries 256 bits of entropy, so storage uses a plain
//! collision-resistant hash rather than the slow salted one reserved for
//! low-entropy secrets.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::account::Account;

/// Why a presented recovery token was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecoveryError {
    #[error("recovery token has expired")]
    Expired,
    #[error("recovery token is invalid")]
    Mismatch,
}

/// A freshly minted token. `raw` goes out of band; `hash` and `expires_at`
/// go on the account.
#[derive(Clone, Debug)]
pub struct RecoveryToken {
    pub raw: String,
    pub hash: Vec<u8>,
    pub expires_at: i64,
}

/// Mint a recovery token: 32 bytes from the OS RNG, base64url without
/// padding.
///
/// # Errors
///
/// Returns an error when the OS RNG fails.
pub fn issue(now: i64, ttl_seconds: i64) -> Result<RecoveryToken> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate recovery token")?;
    let raw = Base64UrlUnpadded::encode_string(&bytes);
    let hash = hash_token(&raw);
    Ok(RecoveryToken {
        raw,
        hash,
        expires_at: now + ttl_seconds,
    })
}

/// Hash a raw token for storage and comparison.
#[must_use]
pub fn hash_token(raw: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher.finalize().to_vec()
}

/// Check a presented raw token against the account's outstanding pair.
///
/// # Errors
///
/// `Mismatch` when no token is outstanding or the hash differs, `Expired`
/// when the window has passed. Expiry is reported even when the hash would
/// match, so callers can tell a stale-but-genuine attempt apart from a
/// wrong token.
pub fn check(raw: &str, account: &Account, now: i64) -> Result<(), RecoveryError> {
    let (Some(stored_hash), Some(expires_at)) = (
        account.recovery_token_hash.as_deref(),
        account.recovery_token_expires_at,
    ) else {
        return Err(RecoveryError::Mismatch);
    };
    if now > expires_at {
        return Err(RecoveryError::Expired);
    }
    if hash_token(raw) != stored_hash {
        return Err(RecoveryError::Mismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check, hash_token, issue, RecoveryError};
    use crate::account::{Account, Role};
    use base64ct::{Base64UrlUnpadded, Encoding};
    use uuid::Uuid;

    fn account_with_token(hash: Option<Vec<u8>>, expires_at: Option<i64>) -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Anna".to_string(),
            email: "anna@example.com".to_string(),
            role: Role::User,
            secret_hash: "$argon2id$stub".to_string(),
            credential_changed_at: None,
            recovery_token_hash: hash,
            recovery_token_expires_at: expires_at,
            active: true,
        }
    }

    #[test]
    fn test_issue_carries_32_bytes_of_entropy() {
        let token = issue(1_000, 1_200).unwrap();
        let decoded = Base64UrlUnpadded::decode_vec(&token.raw).unwrap();
        assert_eq!(decoded.len(), 32);
        assert_eq!(token.expires_at, 2_200);
        assert_eq!(token.hash, hash_token(&token.raw));
    }

    #[test]
    fn test_issue_tokens_are_unique() {
        let first = issue(0, 60).unwrap();
        let second = issue(0, 60).unwrap();
        assert_ne!(first.raw, second.raw);
    }

    #[test]
    fn test_check_accepts_live_matching_token() {
        let token = issue(1_000, 1_200).unwrap();
        let account = account_with_token(Some(token.hash.clone()), Some(token.expires_at));
        assert_eq!(check(&token.raw, &account, 1_000), Ok(()));
        assert_eq!(check(&token.raw, &account, token.expires_at), Ok(()));
    }

    #[test]
    fn test_check_rejects_expired_token() {
        let token = issue(1_000, 1_200).unwrap();
        let account = account_with_token(Some(token.hash.clone()), Some(token.expires_at));
        assert_eq!(
            check(&token.raw, &account, token.expires_at + 1),
            Err(RecoveryError::Expired)
        );
    }

    #[test]
    fn test_check_reports_expiry_before_mismatch() {
        let token = issue(1_000, 1_200).unwrap();
        let account = account_with_token(Some(token.hash.clone()), Some(token.expires_at));
        assert_eq!(
            check("wrong-token", &account, token.expires_at + 1),
            Err(RecoveryError::Expired)
        );
    }

    #[test]
    fn test_check_rejects_wrong_token() {
        let token = issue(1_000, 1_200).unwrap();
        let account = account_with_token(Some(token.hash.clone()), Some(token.expires_at));
        assert_eq!(
            check("wrong-token", &account, 1_000),
            Err(RecoveryError::Mismatch)
        );
    }

    #[test]
    fn test_check_rejects_when_none_outstanding() {
        let account = account_with_token(None, None);
        assert_eq!(
            check("any-token", &account, 1_000),
            Err(RecoveryError::Mismatch)
        );
    }
}
