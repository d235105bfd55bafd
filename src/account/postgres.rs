//! Postgres-backed account store.
//!
//! Every write that participates in the credential lifecycle is a single
//! conditional statement, so the row-matched count is the only concurrency
//! control needed.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Connection, PgPool, Row};
use std::str::FromStr;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::store::{AccountStore, RedeemOutcome, StoreError};
use super::{Account, NewAccount, Role};

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let role: String = row.try_get("role").context("failed to read role column")?;
    let role = Role::from_str(&role).map_err(|err| StoreError::Backend(anyhow!(err)))?;
    Ok(Account {
        id: row.try_get("id").context("failed to read id column")?,
        name: row.try_get("name").context("failed to read name column")?,
        email: row.try_get("email").context("failed to read email column")?,
        role,
        secret_hash: row
            .try_get("secret_hash")
            .context("failed to read secret_hash column")?,
        credential_changed_at: row
            .try_get("credential_changed_at")
            .context("failed to read credential_changed_at column")?,
        recovery_token_hash: row
            .try_get("recovery_token_hash")
            .context("failed to read recovery_token_hash column")?,
        recovery_token_expires_at: row
            .try_get("recovery_token_expires_at")
            .context("failed to read recovery_token_expires_at column")?,
        active: row.try_get("active").context("failed to read active column")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")?;

        Ok(())
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = r"
            INSERT INTO accounts (name, email, role, secret_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, role, secret_hash,
                EXTRACT(EPOCH FROM credential_changed_at)::BIGINT AS credential_changed_at,
                recovery_token_hash,
                EXTRACT(EPOCH FROM recovery_token_expires_at)::BIGINT AS recovery_token_expires_at,
                active
        ";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(&account.name)
            .bind(&account.email)
            .bind(account.role.as_str())
            .bind(&account.secret_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::DuplicateEmail
                } else {
                    StoreError::Backend(anyhow!(err).context("failed to insert account"))
                }
            })?;

        account_from_row(&row)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Option<Account>, StoreError> {
        let query = r"
            SELECT id, name, email, role, secret_hash,
                EXTRACT(EPOCH FROM credential_changed_at)::BIGINT AS credential_changed_at,
                recovery_token_hash,
                EXTRACT(EPOCH FROM recovery_token_expires_at)::BIGINT AS recovery_token_expires_at,
                active
            FROM accounts
            WHERE id = $1 AND (active OR $2)
        ";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(id)
            .bind(include_inactive)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up account by id")?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_email(
        &self,
        email: &str,
        include_inactive: bool,
    ) -> Result<Option<Account>, StoreError> {
        let query = r"
            SELECT id, name, email, role, secret_hash,
                EXTRACT(EPOCH FROM credential_changed_at)::BIGINT AS credential_changed_at,
                recovery_token_hash,
                EXTRACT(EPOCH FROM recovery_token_expires_at)::BIGINT AS recovery_token_expires_at,
                active
            FROM accounts
            WHERE email = $1 AND (active OR $2)
        ";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(email)
            .bind(include_inactive)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up account by email")?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn list(&self, include_inactive: bool) -> Result<Vec<Account>, StoreError> {
        let query = r"
            SELECT id, name, email, role, secret_hash,
                EXTRACT(EPOCH FROM credential_changed_at)::BIGINT AS credential_changed_at,
                recovery_token_hash,
                EXTRACT(EPOCH FROM recovery_token_expires_at)::BIGINT AS recovery_token_expires_at,
                active
            FROM accounts
            WHERE active OR $1
            ORDER BY email
        ";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        let rows = sqlx::query(query)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list accounts")?;

        rows.iter().map(account_from_row).collect()
    }

    async fn update_secret(
        &self,
        id: Uuid,
        secret_hash: &str,
        changed_at: i64,
    ) -> Result<(), StoreError> {
        // GREATEST keeps the change instant monotonic even if a laggy
        // writer hands in an older timestamp.
        let query = r"
            UPDATE accounts
            SET secret_hash = $2,
                credential_changed_at =
                    GREATEST(COALESCE(credential_changed_at, TO_TIMESTAMP(0)), TO_TIMESTAMP($3)),
                updated_at = NOW()
            WHERE id = $1
        ";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );

        let result = sqlx::query(query)
            .bind(id)
            .bind(secret_hash)
            .bind(changed_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update secret hash")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(anyhow!("account not found: {id}")));
        }

        Ok(())
    }

    async fn set_recovery_token(
        &self,
        id: Uuid,
        token_hash: &[u8],
        expires_at: i64,
    ) -> Result<(), StoreError> {
        let query = r"
            UPDATE accounts
            SET recovery_token_hash = $2,
                recovery_token_expires_at = TO_TIMESTAMP($3),
                updated_at = NOW()
            WHERE id = $1
        ";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );

        let result = sqlx::query(query)
            .bind(id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to store recovery token")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(anyhow!("account not found: {id}")));
        }

        Ok(())
    }

    async fn clear_recovery_token(&self, id: Uuid) -> Result<(), StoreError> {
        let query = r"
            UPDATE accounts
            SET recovery_token_hash = NULL,
                recovery_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
        ";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );

        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to clear recovery token")?;

        Ok(())
    }

    async fn redeem_recovery(
        &self,
        id: Uuid,
        token_hash: &[u8],
        new_secret_hash: &str,
        now: i64,
    ) -> Result<RedeemOutcome, StoreError> {
        // One conditional update: the WHERE clause is the compare, the SET
        // installs the new secret and clears the token pair, so of two
        // concurrent redemptions only one can match a row.
        let query = r"
            UPDATE accounts
            SET secret_hash = $3,
                credential_changed_at =
                    GREATEST(COALESCE(credential_changed_at, TO_TIMESTAMP(0)), TO_TIMESTAMP($4)),
                recovery_token_hash = NULL,
                recovery_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND recovery_token_hash = $2
              AND recovery_token_expires_at >= TO_TIMESTAMP($4)
              AND active
        ";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );

        let result = sqlx::query(query)
            .bind(id)
            .bind(token_hash)
            .bind(new_secret_hash)
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to redeem recovery token")?;

        if result.rows_affected() == 0 {
            Ok(RedeemOutcome::AlreadyCleared)
        } else {
            Ok(RedeemOutcome::Redeemed)
        }
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        let query = r"
            UPDATE accounts
            SET active = FALSE,
                updated_at = NOW()
            WHERE id = $1
        ";

        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );

        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to deactivate account")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::is_unique_violation;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDatabaseError {
        code: Option<String>,
    }

    impl fmt::Display for TestDatabaseError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDatabaseError {}

    impl sqlx::error::DatabaseError for TestDatabaseError {
        fn message(&self) -> &str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.as_deref().map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.code.as_deref() == Some("23505") {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::Other
            }
        }
    }

    #[test]
    fn test_is_unique_violation() {
        let unique = sqlx::Error::Database(Box::new(TestDatabaseError {
            code: Some("23505".to_string()),
        }));
        assert!(is_unique_violation(&unique));

        let other = sqlx::Error::Database(Box::new(TestDatabaseError {
            code: Some("23503".to_string()),
        }));
        assert!(!is_unique_violation(&other));

        let no_code = sqlx::Error::Database(Box::new(TestDatabaseError { code: None }));
        assert!(!is_unique_violation(&no_code));

        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
