//! Account rows in PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use finance_engine::{Account, AccountId, NewAccount, PrimaryStore, RowsAffected, StoreError};
use sqlx::{PgPool, Row};

/// A stored account row from the database.
#[derive(Debug)]
pub struct StoredAccount {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub name: String,
    pub balance: f64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredAccount {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredAccount {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
            name: row.try_get("name")?,
            balance: row.try_get("balance")?,
        })
    }
}

impl StoredAccount {
    /// Convert database row to an engine Account.
    pub fn into_account(self) -> Account {
        Account {
            id: self.id as AccountId,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            name: self.name,
            balance: self.balance,
        }
    }
}

/// Map a sqlx error onto the store error the engine understands.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

/// Ids above `i64::MAX` cannot exist in a BIGSERIAL column.
fn row_id(id: AccountId) -> Option<i64> {
    i64::try_from(id).ok()
}

/// The primary store backed by the `accounts` table.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrimaryStore for PgAccountStore {
    async fn insert(&self, account: NewAccount) -> Result<(Account, RowsAffected), StoreError> {
        let stored = sqlx::query_as::<_, StoredAccount>(
            r#"
            INSERT INTO accounts (name, balance)
            VALUES ($1, $2)
            RETURNING id, created_at, updated_at, deleted_at, name, balance
            "#,
        )
        .bind(&account.name)
        .bind(account.balance)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok((stored.into_account(), 1))
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let Some(row_id) = row_id(id) else {
            return Ok(None);
        };

        let stored = sqlx::query_as::<_, StoredAccount>(
            r#"
            SELECT id, created_at, updated_at, deleted_at, name, balance
            FROM accounts
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(row_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(stored.map(StoredAccount::into_account))
    }

    async fn scan_all(&self) -> Result<Vec<Account>, StoreError> {
        let stored = sqlx::query_as::<_, StoredAccount>(
            r#"
            SELECT id, created_at, updated_at, deleted_at, name, balance
            FROM accounts
            WHERE deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(stored.into_iter().map(StoredAccount::into_account).collect())
    }

    async fn save(&self, account: &mut Account) -> Result<RowsAffected, StoreError> {
        let Some(row_id) = row_id(account.id) else {
            return Ok(0);
        };

        let updated_at: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            UPDATE accounts
            SET name = $2, balance = $3, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING updated_at
            "#,
        )
        .bind(row_id)
        .bind(&account.name)
        .bind(account.balance)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(match updated_at {
            Some((at,)) => {
                account.updated_at = at;
                1
            }
            None => 0,
        })
    }

    async fn soft_delete(&self, account: &mut Account) -> Result<RowsAffected, StoreError> {
        let Some(row_id) = row_id(account.id) else {
            return Ok(0);
        };

        let deleted_at: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            UPDATE accounts
            SET deleted_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING deleted_at
            "#,
        )
        .bind(row_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(match deleted_at {
            Some((at,)) => {
                account.deleted_at = Some(at);
                1
            }
            None => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_outside_bigint_range_have_no_row() {
        assert_eq!(row_id(1), Some(1));
        assert_eq!(row_id(i64::MAX as u64), Some(i64::MAX));
        assert_eq!(row_id(u64::MAX), None);
    }

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            store_error(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn stored_row_converts_to_account() {
        let at = Utc::now();
        let account = StoredAccount {
            id: 9,
            created_at: at,
            updated_at: at,
            deleted_at: None,
            name: "Alice".into(),
            balance: 12.5,
        }
        .into_account();

        assert_eq!(account.id, 9);
        assert_eq!(account.name, "Alice");
        assert!(!account.is_deleted());
    }
}
