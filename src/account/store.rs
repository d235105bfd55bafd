//! Account store abstraction and the in-memory implementation used by
//! local development and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Account, NewAccount};

/// Store-level failures. Duplicate emails are typed so signup can answer
/// with a conflict without parsing backend errors at the call site.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email is already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Result of a conditional recovery redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// The stored token matched and was cleared together with the secret
    /// write.
    Redeemed,
    /// The stored token no longer matches, usually because a concurrent
    /// redemption already cleared it.
    AlreadyCleared,
}

/// Durable account store.
///
/// Read paths take an explicit `include_inactive` flag; identity-bearing
/// lookups pass `false` so deactivated accounts never authenticate. The
/// store is also the concurrency boundary: `redeem_recovery` applies its
/// compare-and-clear as one atomic update, so two concurrent redemptions of
/// the same token cannot both succeed.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Cheap liveness check for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a new account.
    ///
    /// Fails with [`StoreError::DuplicateEmail`] when the normalized email
    /// is already taken.
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_id(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(
        &self,
        email: &str,
        include_inactive: bool,
    ) -> Result<Option<Account>, StoreError>;

    async fn list(&self, include_inactive: bool) -> Result<Vec<Account>, StoreError>;

    /// Write a new secret hash and stamp the credential-change instant.
    /// The stored instant never moves backwards.
    async fn update_secret(
        &self,
        id: Uuid,
        secret_hash: &str,
        changed_at: i64,
    ) -> Result<(), StoreError>;

    /// Attach a recovery token hash and its expiry as a pair, replacing any
    /// outstanding pair.
    async fn set_recovery_token(
        &self,
        id: Uuid,
        token_hash: &[u8],
        expires_at: i64,
    ) -> Result<(), StoreError>;

    /// Drop any outstanding recovery token pair. Idempotent.
    async fn clear_recovery_token(&self, id: Uuid) -> Result<(), StoreError>;

    /// Compare the stored recovery token hash and, on a live match, write
    /// the new secret hash, stamp the change instant, and clear the token
    /// pair in the same update.
    async fn redeem_recovery(
        &self,
        id: Uuid,
        token_hash: &[u8],
        new_secret_hash: &str,
        now: i64,
    ) -> Result<RedeemOutcome, StoreError>;

    /// Soft-delete: the account stays on record but can no longer
    /// authenticate.
    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError>;
}

/// In-memory store. A single mutex gives each operation the one-winner
/// semantics the SQL store gets from conditional updates.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().await;
        if accounts
            .values()
            .any(|existing| existing.email == account.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        let account = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            role: account.role,
            secret_hash: account.secret_hash,
            credential_changed_at: None,
            recovery_token_hash: None,
            recovery_token_expires_at: None,
            active: true,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .get(&id)
            .filter(|account| include_inactive || account.active)
            .cloned())
    }

    async fn find_by_email(
        &self,
        email: &str,
        include_inactive: bool,
    ) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .values()
            .find(|account| account.email == email)
            .filter(|account| include_inactive || account.active)
            .cloned())
    }

    async fn list(&self, include_inactive: bool) -> Result<Vec<Account>, StoreError> {
        let accounts = self.accounts.lock().await;
        let mut entries: Vec<Account> = accounts
            .values()
            .filter(|account| include_inactive || account.active)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(entries)
    }

    async fn update_secret(
        &self,
        id: Uuid,
        secret_hash: &str,
        changed_at: i64,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("account not found: {id}")))?;
        account.secret_hash = secret_hash.to_string();
        account.credential_changed_at = Some(
            account
                .credential_changed_at
                .map_or(changed_at, |previous| previous.max(changed_at)),
        );
        Ok(())
    }

    async fn set_recovery_token(
        &self,
        id: Uuid,
        token_hash: &[u8],
        expires_at: i64,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("account not found: {id}")))?;
        account.recovery_token_hash = Some(token_hash.to_vec());
        account.recovery_token_expires_at = Some(expires_at);
        Ok(())
    }

    async fn clear_recovery_token(&self, id: Uuid) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.recovery_token_hash = None;
            account.recovery_token_expires_at = None;
        }
        Ok(())
    }

    async fn redeem_recovery(
        &self,
        id: Uuid,
        token_hash: &[u8],
        new_secret_hash: &str,
        now: i64,
    ) -> Result<RedeemOutcome, StoreError> {
        let mut accounts = self.accounts.lock().await;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(RedeemOutcome::AlreadyCleared);
        };
        let live_match = account.active
            && account.recovery_token_hash.as_deref() == Some(token_hash)
            && account
                .recovery_token_expires_at
                .is_some_and(|expires_at| expires_at >= now);
        if !live_match {
            return Ok(RedeemOutcome::AlreadyCleared);
        }
        account.secret_hash = new_secret_hash.to_string();
        account.credential_changed_at = Some(
            account
                .credential_changed_at
                .map_or(now, |previous| previous.max(now)),
        );
        account.recovery_token_hash = None;
        account.recovery_token_expires_at = None;
        Ok(RedeemOutcome::Redeemed)
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("account not found: {id}")))?;
        account.active = false;
        Ok(())
    }
}
